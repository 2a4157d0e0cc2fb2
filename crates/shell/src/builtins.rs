//! Die eingebauten Befehle: help, info, exit und blocked

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use torhaus_auth::{LoginSperre, SperrArt};

use crate::registry::{BefehlsRegister, EingebauterBefehl};
use crate::resolver::{basisname, datei_in_wurzel};
use crate::session::{SitzungsKanal, SitzungsKontext};

/// Baut das Standard-Register mit allen eingebauten Befehlen auf
pub fn standard_register(sperre: Arc<LoginSperre>, hilfe_wurzel: PathBuf) -> BefehlsRegister {
    let mut register = BefehlsRegister::neu();
    register.registrieren("help", Arc::new(HilfeBefehl { hilfe_wurzel }));
    register.registrieren("info", Arc::new(InfoBefehl));
    register.registrieren("exit", Arc::new(ExitBefehl));
    register.registrieren("blocked", Arc::new(GesperrtBefehl { sperre }));
    register
}

/// `help [thema]` – Hilfethema ausgeben und erlaubte Befehle auflisten
pub struct HilfeBefehl {
    pub hilfe_wurzel: PathBuf,
}

#[async_trait]
impl EingebauterBefehl for HilfeBefehl {
    async fn ausfuehren(
        &self,
        kanal: &mut dyn SitzungsKanal,
        kontext: &SitzungsKontext,
        args: &[String],
    ) {
        if args.len() == 1 {
            let thema = basisname(&args[0]);
            match datei_in_wurzel(&self.hilfe_wurzel, thema) {
                Some(pfad) => {
                    match tokio::fs::read(&pfad).await {
                        Ok(daten) => kanal.schreiben(&daten),
                        Err(fehler) => {
                            tracing::error!(
                                pfad = %pfad.display(),
                                %fehler,
                                "Hilfethema nicht lesbar"
                            );
                            kanal.zeile_schreiben("Error reading help topic");
                        }
                    }
                    return;
                }
                None => {
                    kanal.zeile_schreiben(&format!("No specific help for command: {thema}"));
                    kanal.zeile_schreiben("");
                }
            }
        }

        kanal.zeile_schreiben("Available commands:");
        for befehl in &kontext.benutzer.allowed {
            kanal.zeile_schreiben(&format!("  - {befehl}"));
        }
    }
}

/// `info` – Angaben zum angemeldeten Benutzer
pub struct InfoBefehl;

#[async_trait]
impl EingebauterBefehl for InfoBefehl {
    async fn ausfuehren(
        &self,
        kanal: &mut dyn SitzungsKanal,
        kontext: &SitzungsKontext,
        _args: &[String],
    ) {
        let benutzer = &kontext.benutzer;
        kanal.zeile_schreiben(&format!("You are logged in as: {}", benutzer.username));
        if benutzer.admin {
            kanal.zeile_schreiben("You are an admin user.");
        }
        if !benutzer.restrict.is_empty() {
            kanal.zeile_schreiben(&format!("Restricted to: {}", benutzer.restrict));
        }
    }
}

/// `exit` – beendet die Sitzung
pub struct ExitBefehl;

#[async_trait]
impl EingebauterBefehl for ExitBefehl {
    async fn ausfuehren(
        &self,
        kanal: &mut dyn SitzungsKanal,
        _kontext: &SitzungsKontext,
        _args: &[String],
    ) {
        kanal.zeile_schreiben("Goodbye!");
        kanal.beenden();
    }
}

/// `blocked` – administrative Anzeige der Login-Sperre
///
/// Nur-admin; die Pruefung uebernimmt der Dispatcher ueber `nur_admin()`.
pub struct GesperrtBefehl {
    pub sperre: Arc<LoginSperre>,
}

#[async_trait]
impl EingebauterBefehl for GesperrtBefehl {
    async fn ausfuehren(
        &self,
        kanal: &mut dyn SitzungsKanal,
        _kontext: &SitzungsKontext,
        _args: &[String],
    ) {
        let eintraege = self.sperre.gesperrte_auflisten();

        kanal.zeile_schreiben("Currently blocked IPs:");
        for eintrag in eintraege.iter().filter(|e| e.art == SperrArt::Herkunft) {
            kanal.zeile_schreiben(&format!(
                "  IP: {:<15}  Failures: {}  Blocked until: {}",
                eintrag.kennung,
                eintrag.fehlversuche,
                eintrag.gesperrt_bis.to_rfc3339()
            ));
        }

        kanal.zeile_schreiben("");
        kanal.zeile_schreiben("Blocked usernames:");
        for eintrag in eintraege.iter().filter(|e| e.art == SperrArt::Benutzer) {
            kanal.zeile_schreiben(&format!(
                "  User: {:<10}  Failures: {}  Blocked until: {}",
                eintrag.kennung,
                eintrag.fehlversuche,
                eintrag.gesperrt_bis.to_rfc3339()
            ));
        }

        if eintraege.is_empty() {
            kanal.zeile_schreiben("No blocked entries.");
        }
    }

    fn nur_admin(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::PufferKanal;
    use torhaus_auth::{Benutzer, SperrKonfig};

    fn kontext(allowed: &[&str], admin: bool) -> SitzungsKontext {
        SitzungsKontext {
            benutzer: Benutzer {
                username: "bob".into(),
                hash: String::new(),
                admin,
                restrict: "read-only".into(),
                allowed: allowed.iter().map(|s| s.to_string()).collect(),
                pubkeys: vec![],
                prompt: None,
                banner: None,
            },
            herkunft: "127.0.0.1".into(),
        }
    }

    fn als_text(kanal: &PufferKanal) -> String {
        String::from_utf8_lossy(kanal.inhalt()).into_owned()
    }

    #[tokio::test]
    async fn help_ohne_argumente_listet_genau_die_allowliste() {
        let dir = tempfile::tempdir().expect("Temp-Verzeichnis");
        let befehl = HilfeBefehl {
            hilfe_wurzel: dir.path().to_path_buf(),
        };
        let mut kanal = PufferKanal::neu();
        befehl
            .ausfuehren(&mut kanal, &kontext(&["help", "info"], false), &[])
            .await;

        let ausgabe = als_text(&kanal);
        assert_eq!(
            ausgabe,
            "Available commands:\n  - help\n  - info\n"
        );
    }

    #[tokio::test]
    async fn help_mit_thema_gibt_dateiinhalt_aus() {
        let dir = tempfile::tempdir().expect("Temp-Verzeichnis");
        std::fs::write(dir.path().join("info"), "info zeigt Benutzerdaten\n").expect("Schreiben");
        let befehl = HilfeBefehl {
            hilfe_wurzel: dir.path().to_path_buf(),
        };
        let mut kanal = PufferKanal::neu();
        befehl
            .ausfuehren(&mut kanal, &kontext(&["help"], false), &["info".into()])
            .await;

        assert_eq!(als_text(&kanal), "info zeigt Benutzerdaten\n");
    }

    #[tokio::test]
    async fn help_mit_unbekanntem_thema_nennt_das_thema_und_listet() {
        let dir = tempfile::tempdir().expect("Temp-Verzeichnis");
        let befehl = HilfeBefehl {
            hilfe_wurzel: dir.path().to_path_buf(),
        };
        let mut kanal = PufferKanal::neu();
        befehl
            .ausfuehren(&mut kanal, &kontext(&["help"], false), &["../nix".into()])
            .await;

        let ausgabe = als_text(&kanal);
        // Thema wird auf den Basisnamen reduziert
        assert!(ausgabe.starts_with("No specific help for command: nix\n"));
        assert!(ausgabe.contains("Available commands:"));
    }

    #[tokio::test]
    async fn info_zeigt_benutzer_admin_und_restriktion() {
        let mut kanal = PufferKanal::neu();
        InfoBefehl
            .ausfuehren(&mut kanal, &kontext(&[], true), &[])
            .await;

        let ausgabe = als_text(&kanal);
        assert!(ausgabe.contains("You are logged in as: bob"));
        assert!(ausgabe.contains("You are an admin user."));
        assert!(ausgabe.contains("Restricted to: read-only"));
    }

    #[tokio::test]
    async fn exit_schreibt_abschied_und_beendet() {
        let mut kanal = PufferKanal::neu();
        ExitBefehl
            .ausfuehren(&mut kanal, &kontext(&[], false), &[])
            .await;
        assert_eq!(als_text(&kanal), "Goodbye!\n");
        assert!(kanal.ist_beendet());
    }

    #[tokio::test]
    async fn blocked_zeigt_gesperrte_herkunft_mit_zaehler_und_ablauf() {
        let sperre = LoginSperre::neu(SperrKonfig::default());
        for _ in 0..5 {
            sperre.fehlschlag_registrieren("10.0.0.9", "mallory");
        }

        let befehl = GesperrtBefehl {
            sperre: Arc::clone(&sperre),
        };
        let mut kanal = PufferKanal::neu();
        befehl.ausfuehren(&mut kanal, &kontext(&[], true), &[]).await;

        let ausgabe = als_text(&kanal);
        assert!(ausgabe.contains("10.0.0.9"));
        assert!(ausgabe.contains("Failures: 5"));
        assert!(ausgabe.contains("Blocked until:"));
        assert!(!ausgabe.contains("No blocked entries."));
    }

    #[tokio::test]
    async fn blocked_ohne_sperren_meldet_leere_liste() {
        let befehl = GesperrtBefehl {
            sperre: LoginSperre::neu(SperrKonfig::default()),
        };
        let mut kanal = PufferKanal::neu();
        befehl.ausfuehren(&mut kanal, &kontext(&[], true), &[]).await;
        assert!(als_text(&kanal).contains("No blocked entries."));
    }

    #[test]
    fn blocked_ist_nur_admin() {
        let befehl = GesperrtBefehl {
            sperre: LoginSperre::neu(SperrKonfig::default()),
        };
        assert!(befehl.nur_admin());
        assert!(!ExitBefehl.nur_admin());
    }

    #[test]
    fn standard_register_enthaelt_alle_vier_befehle() {
        let register = standard_register(
            LoginSperre::neu(SperrKonfig::default()),
            PathBuf::from("/tmp"),
        );
        for name in ["help", "info", "exit", "blocked"] {
            assert!(register.enthaelt(name), "{name} fehlt");
        }
    }
}
