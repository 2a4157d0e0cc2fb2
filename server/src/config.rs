//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use torhaus_auth::SperrKonfig;
use torhaus_shell::BefehlsWurzeln;

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct ServerConfig {
    /// Allgemeine Server-Einstellungen
    pub server: ServerEinstellungen,
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Login-Sperr-Einstellungen
    pub sperre: SperrEinstellungen,
    /// Befehls-Einstellungen
    pub befehle: BefehlsEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Allgemeine Server-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    /// SSH-Versionsstring, den der Server beim Handshake sendet
    pub banner: String,
    /// Pfad zur JSON-Benutzerdatenbank
    pub benutzer_datei: String,
    /// Pfad zum ed25519-Hostschluessel (wird erzeugt falls nicht vorhanden)
    pub hostkey_datei: String,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            banner: "SSH-2.0-Torhaus".into(),
            benutzer_datei: "users.json".into(),
            hostkey_datei: "host_key".into(),
        }
    }
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse fuer den SSH-Listener
    pub bind_adresse: String,
    /// Port fuer den SSH-Listener
    pub ssh_port: u16,
    /// Inaktivitaets-Timeout in Sekunden (0 = kein Timeout)
    pub inaktivitaet_sekunden: u64,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            ssh_port: 2222,
            inaktivitaet_sekunden: 600,
        }
    }
}

/// Login-Sperr-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SperrEinstellungen {
    /// Fehlversuche pro Herkunfts-IP bis zur Sperre
    pub max_fehlversuche_herkunft: u32,
    /// Fehlversuche pro Benutzername bis zur Sperre
    pub max_fehlversuche_benutzer: u32,
    /// Sperrdauer in Sekunden
    pub sperrdauer_sekunden: u64,
}

impl Default for SperrEinstellungen {
    fn default() -> Self {
        let standard = SperrKonfig::default();
        Self {
            max_fehlversuche_herkunft: standard.max_fehlversuche_herkunft,
            max_fehlversuche_benutzer: standard.max_fehlversuche_benutzer,
            sperrdauer_sekunden: standard.sperrdauer.as_secs(),
        }
    }
}

/// Befehls-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BefehlsEinstellungen {
    /// Wurzelverzeichnis fuer Textbefehle
    pub text_verzeichnis: String,
    /// Wurzelverzeichnis fuer ausfuehrbare Befehle
    pub befehls_verzeichnis: String,
    /// Wurzelverzeichnis fuer Hilfetexte
    pub hilfe_verzeichnis: String,
    /// Zeitlimit fuer externe Befehle in Sekunden
    pub exec_timeout_sekunden: u64,
}

impl Default for BefehlsEinstellungen {
    fn default() -> Self {
        Self {
            text_verzeichnis: "text_commands".into(),
            befehls_verzeichnis: "commands".into(),
            hilfe_verzeichnis: "help_texts".into(),
            exec_timeout_sekunden: 30,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Gibt die vollstaendige Bind-Adresse fuer SSH zurueck
    pub fn ssh_bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.ssh_port)
    }

    /// Baut die Sperr-Konfiguration fuer den Login-Limiter
    pub fn sperr_konfig(&self) -> SperrKonfig {
        SperrKonfig {
            max_fehlversuche_herkunft: self.sperre.max_fehlversuche_herkunft,
            max_fehlversuche_benutzer: self.sperre.max_fehlversuche_benutzer,
            sperrdauer: Duration::from_secs(self.sperre.sperrdauer_sekunden),
        }
    }

    /// Baut die Befehls-Wurzelverzeichnisse fuer den Dispatcher
    pub fn befehls_wurzeln(&self) -> BefehlsWurzeln {
        BefehlsWurzeln {
            text: PathBuf::from(&self.befehle.text_verzeichnis),
            ausfuehrbar: PathBuf::from(&self.befehle.befehls_verzeichnis),
            hilfe: PathBuf::from(&self.befehle.hilfe_verzeichnis),
        }
    }

    /// Zeitlimit fuer externe Befehle
    pub fn exec_limit(&self) -> Duration {
        Duration::from_secs(self.befehle.exec_timeout_sekunden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standardwerte_sind_lauffaehig() {
        let config = ServerConfig::default();
        assert_eq!(config.ssh_bind_adresse(), "0.0.0.0:2222");
        assert_eq!(config.server.banner, "SSH-2.0-Torhaus");
        assert_eq!(config.sperre.max_fehlversuche_herkunft, 5);
        assert_eq!(config.sperre.max_fehlversuche_benutzer, 10);
        assert_eq!(config.sperre.sperrdauer_sekunden, 60);
    }

    #[test]
    fn teilweise_toml_ergaenzt_standardwerte() {
        let toml = r#"
            [netzwerk]
            ssh_port = 2022

            [sperre]
            max_fehlversuche_herkunft = 3
        "#;
        let config: ServerConfig = toml::from_str(toml).expect("TOML parsen");
        assert_eq!(config.netzwerk.ssh_port, 2022);
        assert_eq!(config.sperre.max_fehlversuche_herkunft, 3);
        // Nicht gesetzte Felder fallen auf die Standardwerte zurueck
        assert_eq!(config.sperre.max_fehlversuche_benutzer, 10);
        assert_eq!(config.befehle.exec_timeout_sekunden, 30);
    }

    #[test]
    fn sperr_konfig_uebernimmt_die_konfigurierten_werte() {
        let mut config = ServerConfig::default();
        config.sperre.sperrdauer_sekunden = 120;
        let sperr = config.sperr_konfig();
        assert_eq!(sperr.sperrdauer, Duration::from_secs(120));
    }

    #[test]
    fn fehlende_datei_liefert_standardkonfiguration() {
        let config = ServerConfig::laden("/nicht/vorhanden/config.toml").expect("Standardwerte");
        assert_eq!(config.netzwerk.ssh_port, 2222);
    }
}
