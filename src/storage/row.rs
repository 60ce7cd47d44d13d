//! The fixed row schema: `id`, `username`, `email`.
//!
//! Every row is encoded as a packed, fixed-width byte layout so it can be
//! memcpy'd straight into a leaf cell. There is no generic column system —
//! this store has exactly one schema, known at compile time.

use crate::errors::DbError;

pub const ID_SIZE: usize = std::mem::size_of::<u32>();
pub const USERNAME_SIZE: usize = 33;
pub const EMAIL_SIZE: usize = 256;
pub const ROW_SIZE: usize = ID_SIZE + USERNAME_SIZE + EMAIL_SIZE;

const ID_OFFSET: usize = 0;
const USERNAME_OFFSET: usize = ID_OFFSET + ID_SIZE;
const EMAIL_OFFSET: usize = USERNAME_OFFSET + USERNAME_SIZE;

/// A single table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: u32,
    pub username: [u8; USERNAME_SIZE],
    pub email: [u8; EMAIL_SIZE],
}

impl Row {
    /// Builds a row from owned strings, truncating/zero-padding into the
    /// fixed-width fields. Length validation (the 32/255-byte limits) is a
    /// command-layer concern; this just copies whatever fits.
    pub fn new(id: u32, username: &str, email: &str) -> Row {
        Row {
            id,
            username: str_to_fixed_bytes(username),
            email: str_to_fixed_bytes(email),
        }
    }

    pub fn username_str(&self) -> String {
        fixed_bytes_to_string(&self.username)
    }

    pub fn email_str(&self) -> String {
        fixed_bytes_to_string(&self.email)
    }

    /// Writes this row's packed representation into `dst`, which must be
    /// exactly `ROW_SIZE` bytes.
    pub fn serialize(&self, dst: &mut [u8]) -> Result<(), DbError> {
        if dst.len() != ROW_SIZE {
            return Err(DbError::Storage(format!(
                "Row buffer size mismatch (expected={}, got={})",
                ROW_SIZE,
                dst.len()
            )));
        }
        dst[ID_OFFSET..ID_OFFSET + ID_SIZE].copy_from_slice(&self.id.to_le_bytes());
        dst[USERNAME_OFFSET..USERNAME_OFFSET + USERNAME_SIZE].copy_from_slice(&self.username);
        dst[EMAIL_OFFSET..EMAIL_OFFSET + EMAIL_SIZE].copy_from_slice(&self.email);
        Ok(())
    }

    /// Inverse of `serialize`. `src` must be exactly `ROW_SIZE` bytes.
    pub fn deserialize(src: &[u8]) -> Result<Row, DbError> {
        if src.len() != ROW_SIZE {
            return Err(DbError::Storage(format!(
                "Row buffer size mismatch (expected={}, got={})",
                ROW_SIZE,
                src.len()
            )));
        }
        let id = u32::from_le_bytes(src[ID_OFFSET..ID_OFFSET + ID_SIZE].try_into().unwrap());
        let mut username = [0u8; USERNAME_SIZE];
        username.copy_from_slice(&src[USERNAME_OFFSET..USERNAME_OFFSET + USERNAME_SIZE]);
        let mut email = [0u8; EMAIL_SIZE];
        email.copy_from_slice(&src[EMAIL_OFFSET..EMAIL_OFFSET + EMAIL_SIZE]);
        Ok(Row { id, username, email })
    }
}

fn str_to_fixed_bytes<const N: usize>(input: &str) -> [u8; N] {
    let mut buffer = [0u8; N];
    let bytes = input.as_bytes();
    let len = bytes.len().min(N);
    buffer[..len].copy_from_slice(&bytes[..len]);
    buffer
}

fn fixed_bytes_to_string(buf: &[u8]) -> String {
    let trimmed = buf.split(|&b| b == 0).next().unwrap_or(&[]);
    String::from_utf8_lossy(trimmed).to_string()
}
