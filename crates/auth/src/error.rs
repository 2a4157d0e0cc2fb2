//! Fehlertypen fuer torhaus-auth

use thiserror::Error;

/// Alle moeglichen Fehler in der Authentifizierung
#[derive(Debug, Error)]
pub enum AuthError {
    /// Einheitlicher Fehler fuer jeden abgelehnten Anmeldeversuch.
    ///
    /// Unbekannter Benutzer, falsches Passwort, unbekannter Schluessel und
    /// aktive Sperre liefern alle diesen einen Fehler. Die Gegenseite darf
    /// die Ursachen nicht unterscheiden koennen (keine Benutzer-Enumeration).
    #[error("Anmeldung fehlgeschlagen")]
    AnmeldungFehlgeschlagen,

    // --- Benutzerdatenbank (nur beim Start) ---
    #[error("Benutzerdatenbank nicht lesbar: {0}")]
    DatenbankNichtLesbar(#[from] std::io::Error),

    #[error("Benutzerdatenbank ungueltig: {0}")]
    DatenbankUngueltig(#[from] serde_json::Error),

    // --- Passwort ---
    #[error("Passwort-Hashing fehlgeschlagen: {0}")]
    PasswortHashing(String),
}

/// Result-Alias fuer torhaus-auth
pub type AuthResult<T> = Result<T, AuthError>;
