//! Temporary GRUU envelope (RFC 5627)
//!
//! Temporary GRUUs put an encrypted `(AOR, instance, position)` term in the
//! URI user part so the registrar can resolve them without storing every
//! minted URI. The envelope is AES-128-CFB over a field-separated term
//! encoding, base64 on the outside.
//!
//! The IV is a fixed constant: temp-GRUUs minted by earlier deployments
//! must keep resolving after a restart, and the plaintext is unique per
//! `(AOR, instance, position)` so IV reuse does not repeat ciphertexts.
//! Do not rotate it.

use aes::Aes128;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use cfb_mode::cipher::{AsyncStreamCipher, KeyIvInit};
use sha2::{Digest, Sha256};

use ferrosip_sip_core::{Aor, Scheme, SipError};

type Encryptor = cfb_mode::Encryptor<Aes128>;
type Decryptor = cfb_mode::Decryptor<Aes128>;

const GRUU_IV: [u8; 16] = *b"ferrosip.gruu.iv";

/// Field separator inside the term encoding; cannot occur in SIP tokens.
const SEP: char = '\x1f';

/// The plaintext a temporary GRUU resolves to
#[derive(Debug, Clone, PartialEq)]
pub struct TempGruuTerm {
    pub aor: Aor,
    pub instance_id: String,
    pub pos: u64,
}

/// Symmetric envelope for temporary GRUU user parts
///
/// The key is the first 16 bytes of the process-wide global id installed at
/// startup; the codec is an immutable handle, not ambient state.
#[derive(Clone)]
pub struct GruuCodec {
    key: [u8; 16],
}

impl GruuCodec {
    /// Build a codec from the process global id (at least 16 bytes).
    pub fn new(global_id: &[u8]) -> Result<Self, SipError> {
        if global_id.len() < 16 {
            return Err(SipError::Internal(
                "global id shorter than the GRUU key".to_string(),
            ));
        }
        let mut key = [0u8; 16];
        key.copy_from_slice(&global_id[..16]);
        Ok(GruuCodec { key })
    }

    /// Encrypt raw bytes into the base64 wire form.
    pub fn encrypt(&self, plain: &[u8]) -> String {
        let mut buf = plain.to_vec();
        Encryptor::new(&self.key.into(), &GRUU_IV.into()).encrypt(&mut buf);
        BASE64.encode(buf)
    }

    /// Invert [`GruuCodec::encrypt`]; `None` for anything that is not our
    /// ciphertext.
    pub fn decrypt(&self, encoded: &str) -> Option<Vec<u8>> {
        let mut buf = BASE64.decode(encoded).ok()?;
        Decryptor::new(&self.key.into(), &GRUU_IV.into()).decrypt(&mut buf);
        Some(buf)
    }

    /// Mint the user part for a temporary GRUU.
    pub fn encrypt_term(&self, term: &TempGruuTerm) -> String {
        let plain = format!(
            "{}{SEP}{}{SEP}{}{SEP}{}{SEP}{}",
            term.aor.scheme, term.aor.user, term.aor.domain, term.instance_id, term.pos
        );
        self.encrypt(plain.as_bytes())
    }

    /// Resolve a temporary GRUU user part back to its term.
    pub fn decrypt_term(&self, encoded: &str) -> Option<TempGruuTerm> {
        let plain = self.decrypt(encoded)?;
        let plain = String::from_utf8(plain).ok()?;
        let mut fields = plain.split(SEP);
        let scheme: Scheme = fields.next()?.parse().ok()?;
        let user = fields.next()?;
        let domain = fields.next()?;
        let instance_id = fields.next()?;
        let pos = fields.next()?.parse().ok()?;
        if fields.next().is_some() {
            return None;
        }
        Some(TempGruuTerm {
            aor: Aor::new(scheme, user, domain),
            instance_id: instance_id.to_string(),
            pos,
        })
    }
}

/// Hash a raw `+sip.instance` value into the stored instance id.
pub fn hash_instance(raw: &str) -> String {
    let digest = Sha256::digest(raw.trim_matches('"').as_bytes());
    // 16 bytes of digest keep the `gr` parameter compact.
    digest[..16].iter().map(|b| format!("{b:02x}")).collect()
}
