//! The B+-tree node layout: leaf nodes store key/row cells, internal
//! nodes store key/child-pointer cells. Both are packed into one
//! `PAGE_SIZE` byte buffer with a shared header prefix.
//!
//! | Property           | Internal Node                  | Leaf Node              |
//! |--------------------|---------------------------------|------------------------|
//! | Stores             | keys and pointers to children   | keys and values        |
//! | Number of keys     | up to its capacity               | as many as will fit    |
//! | Number of pointers | number of keys + 1               | none                   |
//! | Key purpose        | used for routing                 | paired with value      |
//!
//! Unlike the generic row-size-parameterized node this crate's storage
//! layer once carried, there is exactly one row layout here, so these
//! are free functions over a bare `[u8; PAGE_SIZE]` rather than a
//! struct caching per-instance cell sizes.

use crate::errors::DbError;
use crate::storage::row::ROW_SIZE;

pub const PAGE_SIZE: usize = 4096;
pub const TABLE_MAX_PAGES: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Leaf,
    Internal,
}

// Common node header layout.
const NODE_TYPE_OFFSET: usize = 0;
const NODE_TYPE_SIZE: usize = 1;
const IS_ROOT_OFFSET: usize = NODE_TYPE_OFFSET + NODE_TYPE_SIZE;
const IS_ROOT_SIZE: usize = 1;
const PARENT_POINTER_OFFSET: usize = IS_ROOT_OFFSET + IS_ROOT_SIZE;
const PARENT_POINTER_SIZE: usize = 4;
pub const COMMON_NODE_HEADER_SIZE: usize = NODE_TYPE_SIZE + IS_ROOT_SIZE + PARENT_POINTER_SIZE;

// Leaf node header/body layout.
const LEAF_NODE_NUM_CELLS_OFFSET: usize = COMMON_NODE_HEADER_SIZE;
const LEAF_NODE_NUM_CELLS_SIZE: usize = 4;
const LEAF_NODE_HEADER_SIZE: usize = COMMON_NODE_HEADER_SIZE + LEAF_NODE_NUM_CELLS_SIZE;
const LEAF_NODE_KEY_SIZE: usize = 4;
const LEAF_NODE_VALUE_SIZE: usize = ROW_SIZE;
const LEAF_NODE_CELL_SIZE: usize = LEAF_NODE_KEY_SIZE + LEAF_NODE_VALUE_SIZE;
const LEAF_NODE_SPACE_FOR_CELLS: usize = PAGE_SIZE - LEAF_NODE_HEADER_SIZE;
pub const LEAF_NODE_MAX_CELLS: usize = LEAF_NODE_SPACE_FOR_CELLS / LEAF_NODE_CELL_SIZE;
// Splits redistribute MAX cells plus the one being inserted, so the two
// halves must sum to MAX + 1, not MAX.
pub const LEAF_NODE_RIGHT_SPLIT_COUNT: usize = (LEAF_NODE_MAX_CELLS + 1) / 2;
pub const LEAF_NODE_LEFT_SPLIT_COUNT: usize = (LEAF_NODE_MAX_CELLS + 1) - LEAF_NODE_RIGHT_SPLIT_COUNT;

// Internal node header/body layout.
const INTERNAL_NODE_NUM_KEYS_OFFSET: usize = COMMON_NODE_HEADER_SIZE;
const INTERNAL_NODE_NUM_KEYS_SIZE: usize = 4;
const INTERNAL_NODE_RIGHT_CHILD_OFFSET: usize =
    INTERNAL_NODE_NUM_KEYS_OFFSET + INTERNAL_NODE_NUM_KEYS_SIZE;
const INTERNAL_NODE_RIGHT_CHILD_SIZE: usize = 4;
const INTERNAL_NODE_HEADER_SIZE: usize =
    COMMON_NODE_HEADER_SIZE + INTERNAL_NODE_NUM_KEYS_SIZE + INTERNAL_NODE_RIGHT_CHILD_SIZE;
const INTERNAL_NODE_CHILD_SIZE: usize = 4;
const INTERNAL_NODE_KEY_SIZE: usize = 4;
const INTERNAL_NODE_CELL_SIZE: usize = INTERNAL_NODE_CHILD_SIZE + INTERNAL_NODE_KEY_SIZE;

/// One page's raw bytes, interpreted in place as either a leaf or an
/// internal node by the functions below.
pub type PageBuf = [u8; PAGE_SIZE];

pub fn node_type(buf: &PageBuf) -> Result<NodeType, DbError> {
    match buf[NODE_TYPE_OFFSET] {
        0 => Ok(NodeType::Leaf),
        1 => Ok(NodeType::Internal),
        other => Err(DbError::Storage(format!("Invalid node type byte: {}", other))),
    }
}

pub fn set_node_type(buf: &mut PageBuf, ty: NodeType) {
    buf[NODE_TYPE_OFFSET] = match ty {
        NodeType::Leaf => 0,
        NodeType::Internal => 1,
    };
}

pub fn is_root(buf: &PageBuf) -> bool {
    buf[IS_ROOT_OFFSET] == 1
}

pub fn set_is_root(buf: &mut PageBuf, value: bool) {
    buf[IS_ROOT_OFFSET] = value as u8;
}

pub fn parent_page_num(buf: &PageBuf) -> u32 {
    read_u32(buf, PARENT_POINTER_OFFSET)
}

pub fn set_parent_page_num(buf: &mut PageBuf, page_num: u32) {
    write_u32(buf, PARENT_POINTER_OFFSET, page_num);
}

fn read_u32(buf: &PageBuf, offset: usize) -> u32 {
    u32::from_le_bytes(buf[offset..offset + 4].try_into().unwrap())
}

fn write_u32(buf: &mut PageBuf, offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

/// Highest key reachable under this node, leaf or internal.
pub fn node_max_key(buf: &PageBuf) -> Result<u32, DbError> {
    match node_type(buf)? {
        NodeType::Leaf => Ok(leaf_node_max_key(buf)),
        NodeType::Internal => Ok(internal_node_max_key(buf)),
    }
}

// --- Leaf node accessors -------------------------------------------------

pub fn initialize_leaf_node(buf: &mut PageBuf) {
    set_node_type(buf, NodeType::Leaf);
    set_is_root(buf, false);
    set_leaf_node_num_cells(buf, 0);
}

pub fn leaf_node_num_cells(buf: &PageBuf) -> u32 {
    read_u32(buf, LEAF_NODE_NUM_CELLS_OFFSET)
}

pub fn set_leaf_node_num_cells(buf: &mut PageBuf, num: u32) {
    write_u32(buf, LEAF_NODE_NUM_CELLS_OFFSET, num);
}

fn leaf_node_cell_offset(cell_num: usize) -> usize {
    LEAF_NODE_HEADER_SIZE + cell_num * LEAF_NODE_CELL_SIZE
}

pub fn leaf_node_cell(buf: &PageBuf, cell_num: usize) -> &[u8] {
    let offset = leaf_node_cell_offset(cell_num);
    &buf[offset..offset + LEAF_NODE_CELL_SIZE]
}

fn leaf_node_cell_mut(buf: &mut PageBuf, cell_num: usize) -> &mut [u8] {
    let offset = leaf_node_cell_offset(cell_num);
    &mut buf[offset..offset + LEAF_NODE_CELL_SIZE]
}

pub fn leaf_node_key(buf: &PageBuf, cell_num: usize) -> u32 {
    let cell = leaf_node_cell(buf, cell_num);
    u32::from_le_bytes(cell[..LEAF_NODE_KEY_SIZE].try_into().unwrap())
}

pub fn set_leaf_node_key(buf: &mut PageBuf, cell_num: usize, key: u32) {
    let cell = leaf_node_cell_mut(buf, cell_num);
    cell[..LEAF_NODE_KEY_SIZE].copy_from_slice(&key.to_le_bytes());
}

pub fn leaf_node_value(buf: &PageBuf, cell_num: usize) -> &[u8] {
    &leaf_node_cell(buf, cell_num)[LEAF_NODE_KEY_SIZE..]
}

pub fn set_leaf_node_value(buf: &mut PageBuf, cell_num: usize, value: &[u8]) {
    debug_assert_eq!(value.len(), LEAF_NODE_VALUE_SIZE);
    leaf_node_cell_mut(buf, cell_num)[LEAF_NODE_KEY_SIZE..].copy_from_slice(value);
}

/// Shifts cells `[from, num_cells)` one slot to the right, making room to
/// insert at `from`. Walks back-to-front so the overlapping copy range
/// never clobbers data still to be read.
pub fn leaf_node_shift_right(buf: &mut PageBuf, from: usize, num_cells: usize) {
    let mut i = num_cells;
    while i > from {
        let (dst, src) = (leaf_node_cell_offset(i), leaf_node_cell_offset(i - 1));
        let mut tmp = [0u8; LEAF_NODE_CELL_SIZE];
        tmp.copy_from_slice(&buf[src..src + LEAF_NODE_CELL_SIZE]);
        buf[dst..dst + LEAF_NODE_CELL_SIZE].copy_from_slice(&tmp);
        i -= 1;
    }
}

/// Copies cell `src` of `src_buf` into cell `dst` of `dst_buf` — used
/// when moving cells across a split boundary into a freshly allocated
/// sibling page.
pub fn leaf_node_copy_cell(dst_buf: &mut PageBuf, dst: usize, src_buf: &PageBuf, src: usize) {
    let src_off = leaf_node_cell_offset(src);
    let dst_off = leaf_node_cell_offset(dst);
    let mut tmp = [0u8; LEAF_NODE_CELL_SIZE];
    tmp.copy_from_slice(&src_buf[src_off..src_off + LEAF_NODE_CELL_SIZE]);
    dst_buf[dst_off..dst_off + LEAF_NODE_CELL_SIZE].copy_from_slice(&tmp);
}

/// Highest key present in this leaf (its last cell). The leaf must
/// contain at least one cell.
pub fn leaf_node_max_key(buf: &PageBuf) -> u32 {
    leaf_node_key(buf, leaf_node_num_cells(buf) as usize - 1)
}

// --- Internal node accessors --------------------------------------------

/// Sentinel meaning "no right child yet", chosen to avoid colliding with
/// page 0, a legitimate page number a literal 0 default would collide with.
pub const INVALID_PAGE_NUM: u32 = u32::MAX;

pub fn initialize_internal_node(buf: &mut PageBuf) {
    set_node_type(buf, NodeType::Internal);
    set_is_root(buf, false);
    set_internal_node_num_keys(buf, 0);
    set_internal_node_right_child(buf, INVALID_PAGE_NUM);
}

pub fn internal_node_num_keys(buf: &PageBuf) -> u32 {
    read_u32(buf, INTERNAL_NODE_NUM_KEYS_OFFSET)
}

pub fn set_internal_node_num_keys(buf: &mut PageBuf, num: u32) {
    write_u32(buf, INTERNAL_NODE_NUM_KEYS_OFFSET, num);
}

pub fn internal_node_right_child(buf: &PageBuf) -> u32 {
    read_u32(buf, INTERNAL_NODE_RIGHT_CHILD_OFFSET)
}

pub fn set_internal_node_right_child(buf: &mut PageBuf, page_num: u32) {
    write_u32(buf, INTERNAL_NODE_RIGHT_CHILD_OFFSET, page_num);
}

fn internal_node_cell_offset(cell_num: usize) -> usize {
    INTERNAL_NODE_HEADER_SIZE + cell_num * INTERNAL_NODE_CELL_SIZE
}

pub fn internal_node_child(buf: &PageBuf, child_num: u32) -> Result<u32, DbError> {
    let num_keys = internal_node_num_keys(buf);
    if child_num > num_keys {
        return Err(DbError::Storage(format!(
            "Tried to access child {} of internal node with {} keys",
            child_num, num_keys
        )));
    }
    if child_num == num_keys {
        Ok(internal_node_right_child(buf))
    } else {
        Ok(read_u32(buf, internal_node_cell_offset(child_num as usize)))
    }
}

pub fn set_internal_node_child(buf: &mut PageBuf, child_num: u32, page_num: u32) {
    let offset = internal_node_cell_offset(child_num as usize);
    write_u32(buf, offset, page_num);
}

pub fn internal_node_key(buf: &PageBuf, key_num: u32) -> u32 {
    let offset = internal_node_cell_offset(key_num as usize) + INTERNAL_NODE_CHILD_SIZE;
    read_u32(buf, offset)
}

pub fn set_internal_node_key(buf: &mut PageBuf, key_num: u32, key: u32) {
    let offset = internal_node_cell_offset(key_num as usize) + INTERNAL_NODE_CHILD_SIZE;
    write_u32(buf, offset, key);
}

/// Highest key reachable under this internal node: the separator key of
/// its last slot, since the right child (by invariant) holds only keys
/// greater than every stored separator.
pub fn internal_node_max_key(buf: &PageBuf) -> u32 {
    internal_node_key(buf, internal_node_num_keys(buf) - 1)
}

/// Binary search for the child index whose subtree could contain `key`
/// (mirrors `leaf_node_find`'s search, one level up).
pub fn internal_node_find_child(buf: &PageBuf, key: u32) -> u32 {
    let num_keys = internal_node_num_keys(buf);
    let mut min_index = 0u32;
    let mut max_index = num_keys; // one-past-max admits the right-child slot
    while min_index != max_index {
        let index = (min_index + max_index) / 2;
        let key_to_right = internal_node_key(buf, index);
        if key_to_right >= key {
            max_index = index;
        } else {
            min_index = index + 1;
        }
    }
    min_index
}
