//! Auth-Gate: prueft Anmeldeversuche gegen das Benutzerregister
//!
//! Konsultiert vor jeder Credential-Auswertung die Login-Sperre und
//! aktualisiert sie nach dem Ergebnis. Jede Ablehnung sieht fuer die
//! Gegenseite identisch aus; die Ursache steht nur im Server-Log.

use std::sync::Arc;

use crate::benutzer::{Benutzer, BenutzerRegister};
use crate::error::{AuthError, AuthResult};
use crate::passwort::passwort_verifizieren;
use crate::sperre::LoginSperre;

/// Ein einzelner Anmeldeversuch
#[derive(Debug, Clone)]
pub enum Anmeldeversuch<'a> {
    Passwort {
        username: &'a str,
        passwort: &'a str,
    },
    /// Oeffentlicher Schluessel in kanonischer authorized_keys-Kodierung
    /// ("<algo> <base64>", ohne Kommentar)
    PublicKey {
        username: &'a str,
        schluessel: &'a str,
    },
}

impl Anmeldeversuch<'_> {
    fn username(&self) -> &str {
        match self {
            Self::Passwort { username, .. } | Self::PublicKey { username, .. } => username,
        }
    }

    fn art(&self) -> &'static str {
        match self {
            Self::Passwort { .. } => "passwort",
            Self::PublicKey { .. } => "publickey",
        }
    }
}

/// Auth-Gate: validiert Anmeldeversuche und pflegt die Login-Sperre
pub struct AuthGate {
    register: Arc<BenutzerRegister>,
    sperre: Arc<LoginSperre>,
}

impl AuthGate {
    pub fn neu(register: Arc<BenutzerRegister>, sperre: Arc<LoginSperre>) -> Arc<Self> {
        Arc::new(Self { register, sperre })
    }

    /// Prueft einen Anmeldeversuch
    ///
    /// Ablauf: Sperr-Check zuerst, identisch fuer Passwort- und
    /// Schluessel-Versuche; bei aktiver Sperre wird das Credential nie
    /// ausgewertet und kein weiterer Fehlversuch gezaehlt. Erfolg loescht
    /// die Fehlversuchs-Historie beider Kennungen, jeder andere Ausgang
    /// zaehlt einen Fehlversuch und liefert den einheitlichen Fehler.
    pub fn anmelden(&self, herkunft: &str, versuch: Anmeldeversuch<'_>) -> AuthResult<Benutzer> {
        let username = versuch.username();

        if self.sperre.ist_gesperrt(herkunft, username) {
            tracing::warn!(
                herkunft,
                username,
                art = versuch.art(),
                "Anmeldeversuch waehrend aktiver Sperre abgelehnt"
            );
            return Err(AuthError::AnmeldungFehlgeschlagen);
        }

        let benutzer = match &versuch {
            Anmeldeversuch::Passwort { passwort, .. } => {
                self.passwort_pruefen(username, passwort)
            }
            Anmeldeversuch::PublicKey { schluessel, .. } => {
                self.schluessel_pruefen(username, schluessel)
            }
        };

        match benutzer {
            Some(benutzer) => {
                self.sperre.erfolg_registrieren(herkunft, username);
                tracing::info!(
                    herkunft,
                    username,
                    art = versuch.art(),
                    "Anmeldung erfolgreich"
                );
                Ok(benutzer)
            }
            None => {
                self.sperre.fehlschlag_registrieren(herkunft, username);
                tracing::warn!(
                    herkunft,
                    username,
                    art = versuch.art(),
                    "Anmeldung fehlgeschlagen"
                );
                Err(AuthError::AnmeldungFehlgeschlagen)
            }
        }
    }

    fn passwort_pruefen(&self, username: &str, passwort: &str) -> Option<Benutzer> {
        let benutzer = self.register.finde(username)?;
        match passwort_verifizieren(passwort, &benutzer.hash) {
            Ok(true) => Some(benutzer.clone()),
            Ok(false) => None,
            Err(fehler) => {
                // Defekter Hash in der Datenbank: serverseitig melden,
                // nach aussen ein gewoehnlicher Fehlversuch
                tracing::error!(username, %fehler, "Passwort-Hash nicht auswertbar");
                None
            }
        }
    }

    fn schluessel_pruefen(&self, username: &str, schluessel: &str) -> Option<Benutzer> {
        let benutzer = self.register.finde(username)?;
        let gegeben = schluessel.trim();
        benutzer
            .pubkeys
            .iter()
            .any(|k| k.trim() == gegeben)
            .then(|| benutzer.clone())
    }
}
