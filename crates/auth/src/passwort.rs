//! Passwort-Verifikation mit Argon2id
//!
//! Die Benutzerdatenbank speichert Hashes im selbstbeschreibenden
//! PHC-Format; Algorithmus, Parameter und Salt stehen im Hash selbst.
//! Die Verifikation liest diese Angaben aus dem gespeicherten String,
//! deshalb bleiben aeltere Hashes nach Parameteraenderungen gueltig.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::error::AuthError;

/// Hasht ein Passwort mit Argon2id und zufaelligem Salt
///
/// Wird nur von Werkzeugen zum Anlegen von Benutzereintraegen gebraucht;
/// der Server selbst hasht nie, er verifiziert nur.
pub fn passwort_hashen(passwort: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(passwort.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::PasswortHashing(e.to_string()))
}

/// Verifiziert ein Passwort gegen einen gespeicherten PHC-Hash
///
/// `Ok(false)` bedeutet falsches Passwort; ein nicht parsbarer Hash ist
/// ein Fehler und wird vom Aufrufer wie ein Fehlversuch behandelt.
pub fn passwort_verifizieren(passwort: &str, hash: &str) -> Result<bool, AuthError> {
    let geparst = PasswordHash::new(hash)
        .map_err(|e| AuthError::PasswortHashing(format!("Hash nicht parsbar: {e}")))?;

    match Argon2::default().verify_password(passwort.as_bytes(), &geparst) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::PasswortHashing(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_ist_selbstbeschreibend() {
        let hash = passwort_hashen("geheim").expect("Hashing fehlgeschlagen");
        assert!(hash.starts_with("$argon2id$"));
    }

    #[test]
    fn korrektes_passwort_wird_akzeptiert() {
        let hash = passwort_hashen("torhaus123").expect("Hashing fehlgeschlagen");
        assert!(passwort_verifizieren("torhaus123", &hash).expect("Verifikation"));
    }

    #[test]
    fn falsches_passwort_wird_abgelehnt() {
        let hash = passwort_hashen("richtig").expect("Hashing fehlgeschlagen");
        assert!(!passwort_verifizieren("falsch", &hash).expect("Verifikation"));
    }

    #[test]
    fn unparsbarer_hash_ist_ein_fehler() {
        assert!(passwort_verifizieren("egal", "kein-phc-string").is_err());
    }
}
