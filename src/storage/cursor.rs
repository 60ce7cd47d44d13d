//! A position `(page, cell)` within the tree, used to read or insert.
//!
//! Cursors borrow the table for the duration of each call rather than
//! for their own lifetime, which avoids holding a `&mut Table` across
//! calls that need to re-borrow `table.pager` while a page borrow from
//! the same struct is still outstanding.

use crate::errors::DbError;
use crate::storage::btree::{self, NodeType};
use crate::storage::table::Table;

pub struct Cursor {
    pub page_num: u32,
    pub cell_num: u32,
    pub end_of_table: bool,
}

impl Cursor {
    /// Positions at the first cell of the leftmost leaf.
    pub fn table_start(table: &mut Table) -> Result<Cursor, DbError> {
        let page_num = leftmost_leaf(table)?;
        let num_cells = btree::leaf_node_num_cells(table.pager.get_page(page_num)?);
        Ok(Cursor {
            page_num,
            cell_num: 0,
            end_of_table: num_cells == 0,
        })
    }

    /// Finds the cell holding `key`, or the cell it should be inserted
    /// at to preserve order. Descends through the root once if the root
    /// is already an internal node (the one level of routing this store
    /// supports).
    pub fn find(table: &mut Table, key: u32) -> Result<Cursor, DbError> {
        let root_page_num = table.root_page_num;
        let root_type = btree::node_type(table.pager.get_page(root_page_num)?)?;
        match root_type {
            NodeType::Leaf => Cursor::leaf_node_find(table, root_page_num, key),
            NodeType::Internal => {
                let child_page_num = {
                    let root = table.pager.get_page(root_page_num)?;
                    let child_index = btree::internal_node_find_child(root, key);
                    btree::internal_node_child(root, child_index)?
                };
                Cursor::leaf_node_find(table, child_page_num, key)
            }
        }
    }

    /// Binary search over a single leaf's cells. On exact match returns
    /// that cell; otherwise the insertion point that keeps keys ordered.
    pub fn leaf_node_find(table: &mut Table, page_num: u32, key: u32) -> Result<Cursor, DbError> {
        let buf = table.pager.get_page(page_num)?;
        let num_cells = btree::leaf_node_num_cells(buf);

        let mut min_index = 0u32;
        let mut one_past_max_index = num_cells;
        let mut found = None;
        while min_index != one_past_max_index {
            let index = (min_index + one_past_max_index) / 2;
            let key_at_index = btree::leaf_node_key(buf, index as usize);
            if key == key_at_index {
                found = Some(index);
                break;
            }
            if key < key_at_index {
                one_past_max_index = index;
            } else {
                min_index = index + 1;
            }
        }

        Ok(Cursor {
            page_num,
            cell_num: found.unwrap_or(min_index),
            end_of_table: false,
        })
    }

    /// Borrows the value slot at the current position.
    pub fn value<'a>(&self, table: &'a mut Table) -> Result<&'a [u8], DbError> {
        let buf = table.pager.get_page(self.page_num)?;
        Ok(btree::leaf_node_value(buf, self.cell_num as usize))
    }

    /// Moves to the next cell, hopping to the sibling leaf (if this
    /// store's bounded one-level tree has one) once the current leaf is
    /// exhausted.
    pub fn advance(&mut self, table: &mut Table) -> Result<(), DbError> {
        let num_cells = btree::leaf_node_num_cells(table.pager.get_page(self.page_num)?);
        self.cell_num += 1;
        if self.cell_num >= num_cells {
            match next_leaf(table, self.page_num)? {
                Some(next_page_num) => {
                    self.page_num = next_page_num;
                    self.cell_num = 0;
                }
                None => self.end_of_table = true,
            }
        }
        Ok(())
    }
}

fn leftmost_leaf(table: &mut Table) -> Result<u32, DbError> {
    let root_page_num = table.root_page_num;
    let root = table.pager.get_page(root_page_num)?;
    match btree::node_type(root)? {
        NodeType::Leaf => Ok(root_page_num),
        NodeType::Internal => btree::internal_node_child(root, 0),
    }
}

/// The sibling leaf that follows `page_num`, if this tree's root has
/// already split into exactly two leaves under an internal root.
fn next_leaf(table: &mut Table, page_num: u32) -> Result<Option<u32>, DbError> {
    let root_page_num = table.root_page_num;
    let root = table.pager.get_page(root_page_num)?;
    if btree::node_type(root)? != NodeType::Internal {
        return Ok(None);
    }
    let left_child = btree::internal_node_child(root, 0)?;
    let right_child = btree::internal_node_right_child(root);
    if page_num == left_child {
        Ok(Some(right_child))
    } else {
        Ok(None)
    }
}
