//! Domain separation labels.
//!
//! Every hash, AEAD associated-data block and signature transcript starts with
//! `"ALBUM-v1." || purpose || "." || len(context) as 4-byte BE || context`, so
//! bytes authenticated for one purpose can never be replayed as another.

/// Label prefix shared by all purposes.
const LABEL_PREFIX: &[u8] = b"ALBUM-v1.";

/// Build a domain-separated label.
pub fn build_domain_label(purpose: &str, context: &[u8]) -> Vec<u8> {
    let mut label = Vec::with_capacity(LABEL_PREFIX.len() + purpose.len() + 1 + 4 + context.len());
    label.extend_from_slice(LABEL_PREFIX);
    label.extend_from_slice(purpose.as_bytes());
    label.extend_from_slice(b".");
    label.extend_from_slice(&(context.len() as u32).to_be_bytes());
    label.extend_from_slice(context);
    label
}

/// Well-known purposes.
pub mod purposes {
    /// Associated data authenticated by the envelope AEAD.
    pub const ENVELOPE_AAD: &str = "ENVELOPE-AAD";
    /// Sender signature over the whole envelope.
    pub const ENVELOPE_SIG: &str = "ENVELOPE-SIG";
}
