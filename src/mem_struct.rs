use age::secrecy::zeroize::Zeroize;

/// Memory-safe container for plaintext bytes handed to or read back from a
/// child process. Zeroed on drop.
pub struct SecureBuffer {
    data: Vec<u8>,
}

impl SecureBuffer {
    pub fn new(mut data: Vec<u8>) -> Self {
        // Ensure capacity equals length to prevent leftover data in unused capacity
        data.shrink_to_fit();
        Self { data }
    }

    pub fn from_slice(slice: &[u8]) -> Self {
        Self::new(slice.to_vec())
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Drop trailing `\n` / `\r\n` terminators in place
    pub fn trim_line_endings(&mut self) {
        while matches!(self.data.last(), Some(b'\n') | Some(b'\r')) {
            if let Some(byte) = self.data.last_mut() {
                byte.zeroize();
            }
            self.data.pop();
        }
    }
}

impl Drop for SecureBuffer {
    fn drop(&mut self) {
        self.data.zeroize();
    }
}
