use core::fmt;

/// Errors produced by the SM9 and SMS4 operations.
///
/// Integrity failures share the single [`Error::InvalidSignature`] variant:
/// a MAC mismatch during decryption, a failed verification equation and a
/// key-unwrap check all report the same error with no position information.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    /// The caller-supplied output buffer is too small; `needed` bytes are
    /// required. Nothing has been written.
    BufferTooSmall {
        /// Required output length in bytes.
        needed: usize,
    },
    /// Curve or pairing arithmetic failed on a degenerate input.
    ComputePairingFailure,
    /// The MAC over the DEM payload could not be computed.
    GenerateMacFailure,
    /// A digest invocation failed.
    HashFailure,
    /// The ciphertext structure is malformed.
    InvalidCiphertext,
    /// The named curve is recognized but is not a supported pairing-friendly
    /// curve.
    InvalidCurve,
    /// The digest input does not have the expected fixed length.
    InvalidDigestLength,
    /// The encryption parameters name an unsupported primitive combination.
    ///
    /// Not produced today: the tagged [`EncParameters`](crate::sm9::enc::EncParameters)
    /// enums make unsupported combinations unrepresentable. Reserved for
    /// configuration surfaces that are not statically constrained, such as
    /// parameters decoded from an external registry.
    InvalidEncParameters,
    /// The identity is empty.
    InvalidId,
    /// The identity exceeds the maximum supported length.
    InvalidIdLength,
    /// An input violates a structural requirement (e.g. a partial block where
    /// whole blocks are required).
    InvalidInput,
    /// The supplied key cannot be used for the requested operation.
    InvalidKey,
    /// A derived or supplied key has an unsupported length.
    InvalidKeyLength,
    /// The configured digest is not usable for this operation.
    ///
    /// Not produced today for the same reason as
    /// [`Error::InvalidEncParameters`]: every representable
    /// [`DigestAlg`](crate::sm9::DigestAlg) is usable everywhere one is
    /// accepted.
    InvalidMd,
    /// A parameter is outside its permitted domain.
    InvalidParameter,
    /// Integrity check failure: signature equation, DEM MAC or key-unwrap
    /// check did not hold.
    InvalidSignature,
    /// Key derivation produced no usable key material.
    KdfFailure,
    /// The curve name is not in the registry of named curves.
    NotNamedCurve,
    /// Encoded domain parameters name an unknown pairing.
    ParsePairing,
    /// The identity maps to the degenerate group element.
    ZeroId,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BufferTooSmall { needed } => {
                write!(f, "output buffer too small, {} bytes required", needed)
            }
            Error::ComputePairingFailure => f.write_str("pairing computation failure"),
            Error::GenerateMacFailure => f.write_str("mac generation failure"),
            Error::HashFailure => f.write_str("hash failure"),
            Error::InvalidCiphertext => f.write_str("invalid ciphertext"),
            Error::InvalidCurve => f.write_str("invalid curve"),
            Error::InvalidDigestLength => f.write_str("invalid digest length"),
            Error::InvalidEncParameters => f.write_str("invalid encryption parameters"),
            Error::InvalidId => f.write_str("invalid identity"),
            Error::InvalidIdLength => f.write_str("invalid identity length"),
            Error::InvalidInput => f.write_str("invalid input"),
            Error::InvalidKey => f.write_str("invalid key"),
            Error::InvalidKeyLength => f.write_str("invalid key length"),
            Error::InvalidMd => f.write_str("invalid message digest"),
            Error::InvalidParameter => f.write_str("invalid parameter"),
            Error::InvalidSignature => f.write_str("integrity check failed"),
            Error::KdfFailure => f.write_str("key derivation failure"),
            Error::NotNamedCurve => f.write_str("not a named curve"),
            Error::ParsePairing => f.write_str("cannot parse pairing"),
            Error::ZeroId => f.write_str("identity maps to the zero element"),
        }
    }
}

#[cfg(feature = "std")]
#[cfg_attr(docsrs, doc(cfg(feature = "std")))]
impl std::error::Error for Error {}
