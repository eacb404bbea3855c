//! Two-key triple SMS4 in EDE form: `E_k1(D_k2(E_k1(x)))` over a 256-bit
//! key split into `k1 || k2`.

use arrayref::array_ref;

use crate::sms4::{Sms4Key, SMS4_BLOCK_SIZE, SMS4_KEY_LENGTH};

/// Key length of the EDE construction in bytes.
pub const SMS4_EDE_KEY_LENGTH: usize = 2 * SMS4_KEY_LENGTH;

/// An expanded two-key triple-SMS4 schedule for one direction.
pub struct Sms4EdeKey {
    k1: Sms4Key,
    k2: Sms4Key,
}

impl Sms4EdeKey {
    /// Expands `key` for encryption: `k1` encrypts, `k2` decrypts.
    pub fn new_encrypt(key: &[u8; SMS4_EDE_KEY_LENGTH]) -> Self {
        Sms4EdeKey {
            k1: Sms4Key::new_encrypt(array_ref![key, 0, SMS4_KEY_LENGTH]),
            k2: Sms4Key::new_decrypt(array_ref![key, SMS4_KEY_LENGTH, SMS4_KEY_LENGTH]),
        }
    }

    /// Expands `key` for decryption: the mirror image of
    /// [`Sms4EdeKey::new_encrypt`].
    pub fn new_decrypt(key: &[u8; SMS4_EDE_KEY_LENGTH]) -> Self {
        Sms4EdeKey {
            k1: Sms4Key::new_decrypt(array_ref![key, 0, SMS4_KEY_LENGTH]),
            k2: Sms4Key::new_encrypt(array_ref![key, SMS4_KEY_LENGTH, SMS4_KEY_LENGTH]),
        }
    }

    /// Runs the triple pass over one block.
    pub fn encrypt_block(&self, block: &[u8; SMS4_BLOCK_SIZE]) -> [u8; SMS4_BLOCK_SIZE] {
        self.k1
            .encrypt_block(&self.k2.encrypt_block(&self.k1.encrypt_block(block)))
    }

    /// Processes eight consecutive blocks in place.
    pub fn encrypt_blocks8(&self, blocks: &mut [u8; 8 * SMS4_BLOCK_SIZE]) {
        self.encrypt_in_place(blocks);
    }

    /// Processes sixteen consecutive blocks in place.
    pub fn encrypt_blocks16(&self, blocks: &mut [u8; 16 * SMS4_BLOCK_SIZE]) {
        self.encrypt_in_place(blocks);
    }

    fn encrypt_in_place(&self, data: &mut [u8]) {
        for chunk in data.chunks_exact_mut(SMS4_BLOCK_SIZE) {
            let block = self.encrypt_block(array_ref![chunk, 0, SMS4_BLOCK_SIZE]);
            chunk.copy_from_slice(&block);
        }
    }
}
