//! The Table facade: opens a database file, tracks the root page, and
//! dispatches insert/select against the B+-tree.

use std::path::Path;

use tracing::{debug, warn};

use crate::errors::DbError;
use crate::storage::btree::{self, NodeType, PageBuf};
use crate::storage::cursor::Cursor;
use crate::storage::pager::Pager;
use crate::storage::row::{Row, ROW_SIZE};

/// Result of executing a prepared statement against the engine — the
/// Rust-native rendering of `{SUCCESS | TABLE_FULL | DUPLICATE_KEY}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Success,
    TableFull,
    DuplicateKey,
}

pub struct Table {
    pub pager: Pager,
    pub root_page_num: u32,
}

impl Table {
    /// Opens (or creates) the database file at `path`. A brand-new file
    /// gets page 0 initialized as an empty leaf marked root.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Table, DbError> {
        let mut pager = Pager::open(path)?;
        if pager.num_pages() == 0 {
            let root = pager.get_page(0)?;
            btree::initialize_leaf_node(root);
            btree::set_is_root(root, true);
        }
        Ok(Table {
            pager,
            root_page_num: 0,
        })
    }

    /// Flushes every populated page and releases the file.
    pub fn close(mut self) -> Result<(), DbError> {
        self.pager.close()
    }

    pub fn insert(&mut self, row: &Row) -> Result<ExecutionOutcome, DbError> {
        let row_id = row.id;
        let cursor = Cursor::find(self, row_id)?;
        let num_cells = btree::leaf_node_num_cells(self.pager.get_page(cursor.page_num)?);

        if cursor.cell_num < num_cells {
            let key_at_index =
                btree::leaf_node_key(self.pager.get_page(cursor.page_num)?, cursor.cell_num as usize);
            if key_at_index == row_id {
                return Ok(ExecutionOutcome::DuplicateKey);
            }
        }

        if num_cells as usize >= btree::LEAF_NODE_MAX_CELLS {
            warn!(
                page_num = cursor.page_num,
                num_cells, "leaf full, splitting"
            );
            return self.leaf_node_split_and_insert(&cursor, row);
        }

        let mut row_bin = [0u8; ROW_SIZE];
        row.serialize(&mut row_bin)?;

        let buf = self.pager.get_page(cursor.page_num)?;
        btree::leaf_node_shift_right(buf, cursor.cell_num as usize, num_cells as usize);
        btree::set_leaf_node_num_cells(buf, num_cells + 1);
        btree::set_leaf_node_key(buf, cursor.cell_num as usize, row_id);
        btree::set_leaf_node_value(buf, cursor.cell_num as usize, &row_bin);
        Ok(ExecutionOutcome::Success)
    }

    /// Splits a full leaf, inserting the new row into whichever half it
    /// belongs. Only the root leaf's first split is carried through to
    /// a real internal root — a leaf that fills with an already-internal
    /// parent has nowhere further to go in this store's bounded tree, so
    /// it reports `TableFull` rather than attempting a second level of
    /// splitting.
    fn leaf_node_split_and_insert(
        &mut self,
        cursor: &Cursor,
        row: &Row,
    ) -> Result<ExecutionOutcome, DbError> {
        let old_page_num = cursor.page_num;
        let old_is_root = btree::is_root(self.pager.get_page(old_page_num)?);
        if !old_is_root {
            warn!(
                page_num = old_page_num,
                "leaf split needed below the root; this tree does not support a second level"
            );
            return Ok(ExecutionOutcome::TableFull);
        }

        let mut row_bin = [0u8; ROW_SIZE];
        row.serialize(&mut row_bin)?;

        let new_page_num = self.pager.allocate_new_page();
        btree::initialize_leaf_node(self.pager.get_page(new_page_num)?);

        let old_snapshot: PageBuf = *self.pager.get_page(old_page_num)?;

        for i in (0..=btree::LEAF_NODE_MAX_CELLS).rev() {
            let dest_is_new = i >= btree::LEAF_NODE_LEFT_SPLIT_COUNT;
            let dest_page = if dest_is_new { new_page_num } else { old_page_num };
            // `i % LEFT_SPLIT_COUNT` is only correct because the two
            // destination ranges are disjoint (i < LEFT_SPLIT_COUNT vs.
            // i >= LEFT_SPLIT_COUNT); it is not a generic modular index.
            let dest_index = i % btree::LEAF_NODE_LEFT_SPLIT_COUNT;

            if i == cursor.cell_num as usize {
                let dest_buf = self.pager.get_page(dest_page)?;
                btree::set_leaf_node_key(dest_buf, dest_index, row.id);
                btree::set_leaf_node_value(dest_buf, dest_index, &row_bin);
            } else {
                let src_index = if i > cursor.cell_num as usize { i - 1 } else { i };
                let dest_buf = self.pager.get_page(dest_page)?;
                btree::leaf_node_copy_cell(dest_buf, dest_index, &old_snapshot, src_index);
            }
        }

        btree::set_leaf_node_num_cells(
            self.pager.get_page(old_page_num)?,
            btree::LEAF_NODE_LEFT_SPLIT_COUNT as u32,
        );
        btree::set_leaf_node_num_cells(
            self.pager.get_page(new_page_num)?,
            btree::LEAF_NODE_RIGHT_SPLIT_COUNT as u32,
        );

        self.create_new_root(new_page_num)?;
        Ok(ExecutionOutcome::Success)
    }

    /// Re-initializes the root page as an internal node with two
    /// children: a freshly allocated left child holding a copy of the
    /// pre-split root, and the already-populated right child.
    fn create_new_root(&mut self, right_child_page_num: u32) -> Result<(), DbError> {
        let left_child_page_num = self.pager.allocate_new_page();
        let root_snapshot: PageBuf = *self.pager.get_page(self.root_page_num)?;

        let left_buf = self.pager.get_page(left_child_page_num)?;
        *left_buf = root_snapshot;
        btree::set_is_root(left_buf, false);

        let left_max_key = btree::leaf_node_max_key(&root_snapshot);

        let root_buf = self.pager.get_page(self.root_page_num)?;
        btree::initialize_internal_node(root_buf);
        btree::set_is_root(root_buf, true);
        btree::set_internal_node_num_keys(root_buf, 1);
        btree::set_internal_node_child(root_buf, 0, left_child_page_num);
        btree::set_internal_node_key(root_buf, 0, left_max_key);
        btree::set_internal_node_right_child(root_buf, right_child_page_num);

        debug!(
            left_child_page_num,
            right_child_page_num, "created new internal root"
        );
        Ok(())
    }

    pub fn select(&mut self) -> Result<Vec<Row>, DbError> {
        let mut rows = Vec::new();
        let mut cursor = Cursor::table_start(self)?;
        while !cursor.end_of_table {
            let row = {
                let value = cursor.value(self)?;
                Row::deserialize(value)?
            };
            rows.push(row);
            cursor.advance(self)?;
        }
        Ok(rows)
    }

    /// Renders the tree structure for the `.btree` meta-command.
    pub fn render_btree(&mut self) -> Result<String, DbError> {
        let mut out = String::new();
        let root_page_num = self.root_page_num;
        self.render_node(root_page_num, 0, &mut out)?;
        Ok(out)
    }

    fn render_node(&mut self, page_num: u32, indent: usize, out: &mut String) -> Result<(), DbError> {
        let buf: PageBuf = *self.pager.get_page(page_num)?;
        let pad = "  ".repeat(indent);
        match btree::node_type(&buf)? {
            NodeType::Leaf => {
                let num_cells = btree::leaf_node_num_cells(&buf);
                out.push_str(&format!("{}- leaf (size {})\n", pad, num_cells));
                for i in 0..num_cells {
                    out.push_str(&format!("{}  - {}\n", pad, btree::leaf_node_key(&buf, i as usize)));
                }
            }
            NodeType::Internal => {
                let num_keys = btree::internal_node_num_keys(&buf);
                out.push_str(&format!("{}- internal (size {})\n", pad, num_keys));
                for i in 0..num_keys {
                    let child = btree::internal_node_child(&buf, i)?;
                    self.render_node(child, indent + 1, out)?;
                    out.push_str(&format!("{}- key {}\n", pad, btree::internal_node_key(&buf, i)));
                }
                let right_child = btree::internal_node_right_child(&buf);
                self.render_node(right_child, indent + 1, out)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_temp() -> (tempfile::TempDir, Table) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        let table = Table::open(&path).unwrap();
        (dir, table)
    }

    /// Minimal seeded LCG (same constants as PCG's multiplier/increment)
    /// for generating reproducible random insertion orders in property
    /// tests, without pulling in a property-testing crate.
    fn lcg_next(state: &mut u64) -> u64 {
        *state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        *state
    }

    /// A Fisher-Yates shuffle of `1..=n` driven by `lcg_next`.
    fn shuffled_keys(seed: u64, n: u32) -> Vec<u32> {
        let mut state = seed;
        let mut keys: Vec<u32> = (1..=n).collect();
        for i in (1..keys.len()).rev() {
            let j = (lcg_next(&mut state) % (i as u64 + 1)) as usize;
            keys.swap(i, j);
        }
        keys
    }

    #[test]
    fn fresh_table_has_empty_leaf_root() {
        let (_dir, mut table) = open_temp();
        assert!(table.select().unwrap().is_empty());
    }

    #[test]
    fn insert_then_select_round_trip() {
        let (_dir, mut table) = open_temp();
        assert_eq!(
            table.insert(&Row::new(1, "alice", "alice@x")).unwrap(),
            ExecutionOutcome::Success
        );
        assert_eq!(
            table.insert(&Row::new(2, "bob", "bob@x")).unwrap(),
            ExecutionOutcome::Success
        );
        let rows = table.select().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, 1);
        assert_eq!(rows[0].username_str(), "alice");
        assert_eq!(rows[1].id, 2);
    }

    #[test]
    fn duplicate_key_is_rejected() {
        let (_dir, mut table) = open_temp();
        table.insert(&Row::new(3, "a", "a@x")).unwrap();
        assert_eq!(
            table.insert(&Row::new(3, "b", "b@x")).unwrap(),
            ExecutionOutcome::DuplicateKey
        );
    }

    #[test]
    fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("persist.db");
        {
            let mut table = Table::open(&path).unwrap();
            table.insert(&Row::new(7, "u7", "e7")).unwrap();
            table.close().unwrap();
        }
        {
            let mut table = Table::open(&path).unwrap();
            let rows = table.select().unwrap();
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0].id, 7);
            assert_eq!(rows[0].username_str(), "u7");
        }
    }

    #[test]
    fn insertions_out_of_order_read_back_sorted() {
        let (_dir, mut table) = open_temp();
        for id in [5u32, 1, 3, 2, 4] {
            table
                .insert(&Row::new(id, &format!("u{}", id), &format!("e{}", id)))
                .unwrap();
        }
        let rows = table.select().unwrap();
        let ids: Vec<u32> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn root_leaf_splits_at_capacity_and_all_rows_survive() {
        let (_dir, mut table) = open_temp();
        for id in 1..=btree::LEAF_NODE_MAX_CELLS as u32 {
            assert_eq!(
                table
                    .insert(&Row::new(id, &format!("u{}", id), &format!("e{}", id)))
                    .unwrap(),
                ExecutionOutcome::Success
            );
        }
        // One more insert forces the root leaf to split into an internal root.
        let overflow_id = btree::LEAF_NODE_MAX_CELLS as u32 + 1;
        assert_eq!(
            table
                .insert(&Row::new(
                    overflow_id,
                    &format!("u{}", overflow_id),
                    &format!("e{}", overflow_id)
                ))
                .unwrap(),
            ExecutionOutcome::Success
        );

        let rows = table.select().unwrap();
        let ids: Vec<u32> = rows.iter().map(|r| r.id).collect();
        let expected: Vec<u32> = (1..=overflow_id).collect();
        assert_eq!(ids, expected);
        assert_eq!(
            ids.len(),
            btree::LEAF_NODE_LEFT_SPLIT_COUNT + btree::LEAF_NODE_RIGHT_SPLIT_COUNT
        );
    }

    #[test]
    fn split_partitions_keys_into_expected_left_and_right_counts() {
        let (_dir, mut table) = open_temp();
        for id in 1..=btree::LEAF_NODE_MAX_CELLS as u32 + 1 {
            table
                .insert(&Row::new(id, "u", "e"))
                .unwrap();
        }
        let left_buf: PageBuf = *table.pager.get_page(table.root_page_num).unwrap();
        assert_eq!(btree::node_type(&left_buf).unwrap(), NodeType::Internal);
        let left_child = btree::internal_node_child(&left_buf, 0).unwrap();
        let right_child = btree::internal_node_right_child(&left_buf);
        let left_cells = btree::leaf_node_num_cells(table.pager.get_page(left_child).unwrap());
        let right_cells = btree::leaf_node_num_cells(table.pager.get_page(right_child).unwrap());
        assert_eq!(left_cells as usize, btree::LEAF_NODE_LEFT_SPLIT_COUNT);
        assert_eq!(right_cells as usize, btree::LEAF_NODE_RIGHT_SPLIT_COUNT);
    }

    #[test]
    fn leaf_fill_to_fourteen_matches_literal_scenario() {
        let (_dir, mut table) = open_temp();
        for id in 1..=13u32 {
            assert_eq!(
                table.insert(&Row::new(id, "u", "e")).unwrap(),
                ExecutionOutcome::Success
            );
        }
        assert_eq!(
            table.insert(&Row::new(14, "u", "e")).unwrap(),
            ExecutionOutcome::Success
        );
        let rows = table.select().unwrap();
        assert_eq!(rows.len(), 14);
    }

    /// P1 (ordering) and P2 (uniqueness) hold after every insert, and P6
    /// (split partition) holds once the forced split happens, regardless
    /// of the order keys arrive in.
    #[test]
    fn property_ordering_uniqueness_and_split_partition_hold_under_random_insertion_order() {
        for seed in [1u64, 42, 12345, 999_999] {
            let (_dir, mut table) = open_temp();
            let n = btree::LEAF_NODE_MAX_CELLS as u32 + 1;
            let keys = shuffled_keys(seed, n);
            let mut inserted: Vec<u32> = Vec::new();

            for &key in &keys {
                assert_eq!(
                    table.insert(&Row::new(key, "u", "e")).unwrap(),
                    ExecutionOutcome::Success,
                    "seed {seed}: insert of {key} failed"
                );
                inserted.push(key);

                let ids: Vec<u32> = table.select().unwrap().iter().map(|r| r.id).collect();
                for w in ids.windows(2) {
                    assert!(w[0] < w[1], "seed {seed}: keys not ascending: {ids:?}");
                }
                let mut expected = inserted.clone();
                expected.sort_unstable();
                assert_eq!(ids, expected, "seed {seed}: key set mismatch after {inserted:?}");
            }

            let root: PageBuf = *table.pager.get_page(table.root_page_num).unwrap();
            assert_eq!(btree::node_type(&root).unwrap(), NodeType::Internal);
            let left_child = btree::internal_node_child(&root, 0).unwrap();
            let right_child = btree::internal_node_right_child(&root);
            let left_cells = btree::leaf_node_num_cells(table.pager.get_page(left_child).unwrap());
            let right_cells = btree::leaf_node_num_cells(table.pager.get_page(right_child).unwrap());
            assert_eq!(
                left_cells as usize,
                btree::LEAF_NODE_LEFT_SPLIT_COUNT,
                "seed {seed}: left leaf cell count"
            );
            assert_eq!(
                right_cells as usize,
                btree::LEAF_NODE_RIGHT_SPLIT_COUNT,
                "seed {seed}: right leaf cell count"
            );

            let mut expected_all = inserted.clone();
            expected_all.sort_unstable();
            let all_ids: Vec<u32> = table.select().unwrap().iter().map(|r| r.id).collect();
            assert_eq!(all_ids, expected_all, "seed {seed}: final scan mismatch");
        }
    }
}
