//! Dispatcher: Zustandsmaschine pro Eingabezeile
//!
//! Parse → Normalisieren → Validieren → Aufloesen → Autorisieren →
//! Ausfuehren. Keine Stufe ist prozess-fatal; jede Ablehnung schreibt
//! ihre Meldung in die Sitzung und die Schleife laeuft weiter.

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::process::Command;

use crate::registry::BefehlsRegister;
use crate::resolver::{basisname, kategorie_aufloesen, token_pruefen, BefehlsKategorie, BefehlsWurzeln};
use crate::session::{SitzungsKanal, SitzungsKontext};

/// Was der Transport nach einer verarbeiteten Zeile tun soll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SitzungsAktion {
    Weiter,
    Beenden,
}

/// Dispatcher fuer genau eine Befehlszeile pro Aufruf
///
/// Pro Sitzung laufen Zeilen strikt sequenziell; der Dispatcher selbst
/// ist zustandslos und wird von allen Sitzungen geteilt.
pub struct Dispatcher {
    register: Arc<BefehlsRegister>,
    wurzeln: BefehlsWurzeln,
    /// Obergrenze fuer die Laufzeit externer Befehle
    exec_limit: Duration,
}

impl Dispatcher {
    pub fn neu(
        register: Arc<BefehlsRegister>,
        wurzeln: BefehlsWurzeln,
        exec_limit: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            register,
            wurzeln,
            exec_limit,
        })
    }

    /// Verarbeitet genau eine Eingabezeile
    pub async fn zeile_verarbeiten(
        &self,
        zeile: &str,
        kanal: &mut dyn SitzungsKanal,
        kontext: &SitzungsKontext,
    ) -> SitzungsAktion {
        let zeile = zeile.trim();
        if zeile.is_empty() {
            return SitzungsAktion::Weiter;
        }

        let mut felder = zeile.split_whitespace();
        let Some(roh) = felder.next() else {
            return SitzungsAktion::Weiter;
        };
        let args: Vec<String> = felder.map(str::to_string).collect();
        let name = basisname(roh).to_string();

        tracing::debug!(
            zeile,
            benutzer = %kontext.benutzer.username,
            herkunft = %kontext.herkunft,
            "Befehlszeile empfangen"
        );

        if let Err(fehler) = token_pruefen(&name) {
            tracing::warn!(
                roh,
                benutzer = %kontext.benutzer.username,
                herkunft = %kontext.herkunft,
                grund = %fehler,
                "Befehls-Token abgelehnt"
            );
            kanal.zeile_schreiben(&fehler.to_string());
            return SitzungsAktion::Weiter;
        }

        let kategorie = kategorie_aufloesen(&name, &self.register, &self.wurzeln);

        if let BefehlsKategorie::Unbekannt = kategorie {
            tracing::info!(
                befehl = %name,
                benutzer = %kontext.benutzer.username,
                herkunft = %kontext.herkunft,
                "Unbekannter Befehl"
            );
            kanal.zeile_schreiben(&format!("Unknown command: {name}"));
            return SitzungsAktion::Weiter;
        }

        // Autorisierung: exakte Mitgliedschaft in der Allow-Liste; das
        // Admin-Flag gewaehrt hier keinen Bypass
        if !kontext.benutzer.darf_ausfuehren(&name) {
            tracing::warn!(
                befehl = %name,
                kategorie = kategorie.name(),
                benutzer = %kontext.benutzer.username,
                herkunft = %kontext.herkunft,
                "Zugriff verweigert"
            );
            kanal.zeile_schreiben(&format!("Access denied to command: {name}"));
            return SitzungsAktion::Weiter;
        }

        match kategorie {
            BefehlsKategorie::Eingebaut(befehl) => {
                if befehl.nur_admin() && !kontext.benutzer.admin {
                    tracing::warn!(
                        befehl = %name,
                        benutzer = %kontext.benutzer.username,
                        herkunft = %kontext.herkunft,
                        "Nur-Admin-Befehl verweigert"
                    );
                    kanal.zeile_schreiben("Access denied: admin only command.");
                    return SitzungsAktion::Weiter;
                }
                tracing::info!(
                    befehl = %name,
                    benutzer = %kontext.benutzer.username,
                    "Eingebauter Befehl wird ausgefuehrt"
                );
                befehl.ausfuehren(kanal, kontext, &args).await;
                if kanal.ist_beendet() {
                    return SitzungsAktion::Beenden;
                }
            }
            BefehlsKategorie::TextAntwort(pfad) => {
                tracing::info!(
                    befehl = %name,
                    benutzer = %kontext.benutzer.username,
                    "Textbefehl wird ausgegeben"
                );
                match tokio::fs::read(&pfad).await {
                    Ok(daten) => kanal.schreiben(&daten),
                    Err(fehler) => {
                        tracing::error!(pfad = %pfad.display(), %fehler, "Textbefehl nicht lesbar");
                        kanal.zeile_schreiben("Error reading text command");
                    }
                }
            }
            BefehlsKategorie::Ausfuehrbar(pfad) => {
                tracing::info!(
                    befehl = %name,
                    benutzer = %kontext.benutzer.username,
                    "Externer Befehl wird gestartet"
                );
                self.extern_ausfuehren(&pfad, &args, kanal, kontext).await;
            }
            BefehlsKategorie::Unbekannt => unreachable!("oben behandelt"),
        }

        SitzungsAktion::Weiter
    }

    /// Startet ein externes Programm und relayt seine gesammelte Ausgabe
    ///
    /// Umgebung nur `USER=<benutzer>`, stdin getrennt, Laufzeit durch
    /// `exec_limit` begrenzt; bei Ueberschreitung wird der Prozess
    /// abgebrochen. Fehlerdetails bleiben im Server-Log, die Sitzung
    /// sieht nur generische Meldungen.
    async fn extern_ausfuehren(
        &self,
        pfad: &Path,
        args: &[String],
        kanal: &mut dyn SitzungsKanal,
        kontext: &SitzungsKontext,
    ) {
        let mut cmd = Command::new(pfad);
        cmd.args(args)
            .env_clear()
            .env("USER", &kontext.benutzer.username)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let ausgabe = match tokio::time::timeout(self.exec_limit, cmd.output()).await {
            Ok(Ok(ausgabe)) => ausgabe,
            Ok(Err(fehler)) => {
                tracing::error!(
                    pfad = %pfad.display(),
                    %fehler,
                    "Start des externen Befehls fehlgeschlagen"
                );
                kanal.zeile_schreiben("Failed to start command");
                return;
            }
            Err(_) => {
                tracing::warn!(
                    pfad = %pfad.display(),
                    limit_secs = self.exec_limit.as_secs(),
                    "Externer Befehl hat das Zeitlimit ueberschritten und wurde abgebrochen"
                );
                kanal.zeile_schreiben("Command timed out");
                return;
            }
        };

        // Fehlerstrom wird hinter die Standardausgabe gehaengt; die
        // Reihenfolge zwischen beiden Stroemen bleibt nicht erhalten
        kanal.schreiben(&ausgabe.stdout);
        kanal.schreiben(&ausgabe.stderr);

        if !ausgabe.status.success() {
            tracing::debug!(
                pfad = %pfad.display(),
                status = ?ausgabe.status.code(),
                "Externer Befehl mit Fehlerstatus beendet"
            );
        }
    }
}
