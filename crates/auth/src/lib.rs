//! torhaus-auth – Benutzerregister, Login-Sperre und Auth-Gate
//!
//! Dieses Crate implementiert:
//! - Benutzerdatenbank (JSON, einmal geladen, danach read-only)
//! - Passwort-Verifikation gegen PHC-Hashes (Argon2id)
//! - Login-Sperre gegen Brute-Force (pro Herkunft und pro Benutzername)
//! - Auth-Gate mit einheitlicher Ablehnung fuer alle Fehlerursachen

pub mod benutzer;
pub mod error;
pub mod gate;
pub mod passwort;
pub mod sperre;

// Bequeme Re-Exporte
pub use benutzer::{Benutzer, BenutzerRegister};
pub use error::{AuthError, AuthResult};
pub use gate::{Anmeldeversuch, AuthGate};
pub use passwort::{passwort_hashen, passwort_verifizieren};
pub use sperre::{LoginSperre, SperrArt, SperrEintrag, SperrKonfig};
