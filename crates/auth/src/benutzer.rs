//! Benutzerdatenbank
//!
//! Wird beim Start einmal aus einer JSON-Datei geladen und ist danach
//! unveraenderlich. Jeder Anmeldeversuch und jede Befehlszeile schlaegt
//! den Benutzer ueber seinen Namen nach.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AuthResult;

/// Ein Benutzer-Datensatz: Identitaet plus Policy
///
/// Die Feldnamen entsprechen dem JSON-Format der Benutzerdatei.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Benutzer {
    /// Eindeutiger Benutzername (Schluessel der Datenbank)
    pub username: String,
    /// Passwort-Hash im selbstbeschreibenden PHC-Format
    pub hash: String,
    /// Admin-Flag; gewaehrt Zugriff auf als nur-admin markierte Befehle,
    /// aber keinen impliziten Bypass der Allow-Liste
    #[serde(default)]
    pub admin: bool,
    /// Freitext-Beschreibung der Einschraenkung (nur Anzeige)
    #[serde(default)]
    pub restrict: String,
    /// Geordnete Allow-Liste der erlaubten Befehlsnamen
    #[serde(default)]
    pub allowed: Vec<String>,
    /// Autorisierte oeffentliche Schluessel in kanonischer
    /// authorized_keys-Kodierung ("<algo> <base64>")
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pubkeys: Vec<String>,
    /// Prompt-Override fuer die interaktive Sitzung
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// Banner-Override, wird beim Sitzungsstart ausgegeben
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner: Option<String>,
}

impl Benutzer {
    /// Prueft ob ein Befehlsname woertlich in der Allow-Liste steht
    ///
    /// Exakter, case-sensitiver Vergleich. Kein Glob, kein Praefix.
    pub fn darf_ausfuehren(&self, befehl: &str) -> bool {
        self.allowed.iter().any(|erlaubt| erlaubt == befehl)
    }
}

/// Read-only-Register aller Benutzer, indiziert nach Benutzername
pub struct BenutzerRegister {
    benutzer: HashMap<String, Benutzer>,
}

impl BenutzerRegister {
    /// Laedt das Register aus einer JSON-Datei (Liste von Datensaetzen)
    ///
    /// Ein Ladefehler ist prozess-fatal; ohne Benutzerdatenbank startet
    /// der Server nicht.
    pub fn laden(pfad: &Path) -> AuthResult<Self> {
        let inhalt = std::fs::read_to_string(pfad)?;
        let liste: Vec<Benutzer> = serde_json::from_str(&inhalt)?;
        let register = Self::aus_liste(liste);
        tracing::info!(
            anzahl = register.anzahl(),
            pfad = %pfad.display(),
            "Benutzerdatenbank geladen"
        );
        Ok(register)
    }

    /// Baut das Register direkt aus einer Liste (fuer Tests und Loader)
    pub fn aus_liste(liste: Vec<Benutzer>) -> Self {
        let benutzer = liste
            .into_iter()
            .map(|b| (b.username.clone(), b))
            .collect();
        Self { benutzer }
    }

    /// Schlaegt einen Benutzer nach Namen nach
    pub fn finde(&self, username: &str) -> Option<&Benutzer> {
        self.benutzer.get(username)
    }

    /// Anzahl der geladenen Benutzer
    pub fn anzahl(&self) -> usize {
        self.benutzer.len()
    }
}
