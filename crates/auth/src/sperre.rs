//! Login-Sperre gegen Brute-Force-Angriffe
//!
//! Zaehlt fehlgeschlagene Anmeldeversuche getrennt pro Herkunfts-IP und
//! pro Benutzername. Erreicht ein Zaehler seinen Schwellwert, ist die
//! Kennung gesperrt bis seit dem letzten Fehlversuch die Sperrdauer
//! verstrichen ist. Der Ablauf wird lazy beim naechsten Check verarbeitet.
//!
//! Kein Persistieren: ein Neustart des Prozesses loescht den gesamten
//! Zustand.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// Konfiguration der Login-Sperre
///
/// Der IP-Schwellwert ist strenger als der Benutzer-Schwellwert: hinter
/// einer IP koennen viele Benutzernamen durchprobiert werden.
#[derive(Debug, Clone)]
pub struct SperrKonfig {
    /// Fehlversuche bis eine Herkunfts-IP gesperrt wird
    pub max_fehlversuche_herkunft: u32,
    /// Fehlversuche bis ein Benutzername gesperrt wird
    pub max_fehlversuche_benutzer: u32,
    /// Sperrdauer ab dem letzten Fehlversuch
    pub sperrdauer: Duration,
}

impl Default for SperrKonfig {
    fn default() -> Self {
        Self {
            max_fehlversuche_herkunft: 5,
            max_fehlversuche_benutzer: 10,
            sperrdauer: Duration::from_secs(60),
        }
    }
}

/// Art einer gesperrten Kennung
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SperrArt {
    Herkunft,
    Benutzer,
}

/// Snapshot-Eintrag fuer die administrative Anzeige
#[derive(Debug, Clone)]
pub struct SperrEintrag {
    pub kennung: String,
    pub art: SperrArt,
    pub fehlversuche: u32,
    pub gesperrt_bis: DateTime<Utc>,
}

/// Fehlversuchs-Zaehler fuer eine einzelne Kennung
///
/// Wird lazy beim ersten Fehlversuch angelegt. Der Zaehler steigt nur
/// durch Fehlversuche und faellt nur durch Ablauf oder Erfolg auf null.
#[derive(Debug, Clone)]
struct FehlversuchEintrag {
    anzahl: u32,
    letzter_fehlschlag: DateTime<Utc>,
    letzter_versuch: DateTime<Utc>,
    gesperrt: bool,
}

impl FehlversuchEintrag {
    fn neu(jetzt: DateTime<Utc>) -> Self {
        Self {
            anzahl: 0,
            letzter_fehlschlag: jetzt,
            letzter_versuch: jetzt,
            gesperrt: false,
        }
    }
}

/// Beide Zaehler-Tabellen unter einem gemeinsamen Lock
///
/// Ein Fehlversuch bzw. Erfolg aktualisiert immer beide Tabellen als
/// eine atomare Einheit; ein halb aktualisierter Zustand ist von aussen
/// nie beobachtbar.
#[derive(Default)]
struct SperrZustand {
    herkunft: HashMap<String, FehlversuchEintrag>,
    benutzer: HashMap<String, FehlversuchEintrag>,
}

/// Login-Sperre: geteilter, veraenderlicher Zustand aller Sitzungen
pub struct LoginSperre {
    konfig: SperrKonfig,
    sperrdauer: chrono::Duration,
    zustand: Mutex<SperrZustand>,
}

impl LoginSperre {
    pub fn neu(konfig: SperrKonfig) -> Arc<Self> {
        let sperrdauer =
            chrono::Duration::from_std(konfig.sperrdauer).unwrap_or(chrono::Duration::MAX);
        Arc::new(Self {
            konfig,
            sperrdauer,
            zustand: Mutex::new(SperrZustand::default()),
        })
    }

    /// Prueft ob Herkunft oder Benutzername aktuell gesperrt ist
    ///
    /// Abgelaufene Sperren werden dabei aufgehoben und ihre Zaehler auf
    /// null gesetzt (lazy Ablauf als Nebeneffekt des Checks). Beide
    /// Kennungen werden immer verarbeitet, auch wenn die erste bereits
    /// gesperrt ist.
    pub fn ist_gesperrt(&self, herkunft: &str, username: &str) -> bool {
        let jetzt = Utc::now();
        let mut zustand = self.zustand.lock();

        let herkunft_gesperrt = zustand
            .herkunft
            .get_mut(herkunft)
            .is_some_and(|e| self.sperre_pruefen(e, jetzt, herkunft, SperrArt::Herkunft));
        let benutzer_gesperrt = zustand
            .benutzer
            .get_mut(username)
            .is_some_and(|e| self.sperre_pruefen(e, jetzt, username, SperrArt::Benutzer));

        herkunft_gesperrt || benutzer_gesperrt
    }

    /// Registriert einen Fehlversuch fuer beide Kennungen
    ///
    /// Stempelt die Zeiten und setzt die Sperre sobald ein Zaehler seinen
    /// Schwellwert erreicht.
    pub fn fehlschlag_registrieren(&self, herkunft: &str, username: &str) {
        let jetzt = Utc::now();
        let mut zustand = self.zustand.lock();

        let eintrag = zustand
            .herkunft
            .entry(herkunft.to_string())
            .or_insert_with(|| FehlversuchEintrag::neu(jetzt));
        if Self::fehlschlag_zaehlen(eintrag, jetzt, self.konfig.max_fehlversuche_herkunft) {
            tracing::warn!(
                herkunft,
                fehlversuche = eintrag.anzahl,
                "Zu viele Fehlversuche von dieser Herkunft, voruebergehend gesperrt"
            );
        }

        let eintrag = zustand
            .benutzer
            .entry(username.to_string())
            .or_insert_with(|| FehlversuchEintrag::neu(jetzt));
        if Self::fehlschlag_zaehlen(eintrag, jetzt, self.konfig.max_fehlversuche_benutzer) {
            tracing::warn!(
                username,
                fehlversuche = eintrag.anzahl,
                "Zu viele Fehlversuche fuer diesen Benutzer, voruebergehend gesperrt"
            );
        }
    }

    /// Registriert eine erfolgreiche Anmeldung
    ///
    /// Loescht beide Eintraege bedingungslos, inklusive aller Historie.
    pub fn erfolg_registrieren(&self, herkunft: &str, username: &str) {
        let mut zustand = self.zustand.lock();
        zustand.herkunft.remove(herkunft);
        zustand.benutzer.remove(username);
    }

    /// Snapshot aller aktuell gesperrten Kennungen
    ///
    /// Fuer die administrative Anzeige; `gesperrt_bis` ist der letzte
    /// Fehlversuch plus Sperrdauer. Herkunfts-Eintraege kommen vor
    /// Benutzer-Eintraegen.
    pub fn gesperrte_auflisten(&self) -> Vec<SperrEintrag> {
        let jetzt = Utc::now();
        let zustand = self.zustand.lock();

        let aktiv = |eintrag: &FehlversuchEintrag| {
            eintrag.gesperrt && jetzt - eintrag.letzter_fehlschlag < self.sperrdauer
        };

        let mut eintraege: Vec<SperrEintrag> = zustand
            .herkunft
            .iter()
            .filter(|(_, e)| aktiv(e))
            .map(|(kennung, e)| SperrEintrag {
                kennung: kennung.clone(),
                art: SperrArt::Herkunft,
                fehlversuche: e.anzahl,
                gesperrt_bis: e.letzter_fehlschlag + self.sperrdauer,
            })
            .collect();
        eintraege.extend(zustand.benutzer.iter().filter(|(_, e)| aktiv(e)).map(
            |(kennung, e)| SperrEintrag {
                kennung: kennung.clone(),
                art: SperrArt::Benutzer,
                fehlversuche: e.anzahl,
                gesperrt_bis: e.letzter_fehlschlag + self.sperrdauer,
            },
        ));
        eintraege
    }

    /// Prueft einen Eintrag auf aktive Sperre und hebt abgelaufene auf
    fn sperre_pruefen(
        &self,
        eintrag: &mut FehlversuchEintrag,
        jetzt: DateTime<Utc>,
        kennung: &str,
        art: SperrArt,
    ) -> bool {
        if !eintrag.gesperrt {
            return false;
        }
        if jetzt - eintrag.letzter_fehlschlag >= self.sperrdauer {
            eintrag.gesperrt = false;
            eintrag.anzahl = 0;
            tracing::info!(kennung, art = ?art, "Sperre abgelaufen und aufgehoben");
            return false;
        }
        true
    }

    /// Zaehlt einen Fehlversuch; gibt `true` zurueck wenn dadurch die
    /// Sperre ausgeloest wurde
    fn fehlschlag_zaehlen(
        eintrag: &mut FehlversuchEintrag,
        jetzt: DateTime<Utc>,
        schwellwert: u32,
    ) -> bool {
        eintrag.anzahl += 1;
        eintrag.letzter_fehlschlag = jetzt;
        eintrag.letzter_versuch = jetzt;
        if eintrag.anzahl >= schwellwert && !eintrag.gesperrt {
            eintrag.gesperrt = true;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_konfig(sperrdauer: Duration) -> SperrKonfig {
        SperrKonfig {
            max_fehlversuche_herkunft: 5,
            max_fehlversuche_benutzer: 10,
            sperrdauer,
        }
    }

    #[test]
    fn unter_schwellwert_nicht_gesperrt() {
        let sperre = LoginSperre::neu(SperrKonfig::default());
        for _ in 0..4 {
            sperre.fehlschlag_registrieren("10.0.0.5", "alice");
        }
        assert!(!sperre.ist_gesperrt("10.0.0.5", "alice"));
    }

    #[test]
    fn herkunft_sperrt_bei_genau_fuenf_fehlversuchen() {
        let sperre = LoginSperre::neu(SperrKonfig::default());
        for _ in 0..5 {
            sperre.fehlschlag_registrieren("10.0.0.5", "alice");
        }
        assert!(sperre.ist_gesperrt("10.0.0.5", "alice"));
        // Der Benutzer-Schwellwert (10) ist noch nicht erreicht; eine
        // andere Herkunft mit demselben Benutzer bleibt frei
        assert!(!sperre.ist_gesperrt("10.0.0.6", "alice"));
    }

    #[test]
    fn benutzer_sperrt_bei_zehn_fehlversuchen_ueber_herkuenfte_hinweg() {
        let sperre = LoginSperre::neu(SperrKonfig::default());
        for i in 0..10 {
            // Jede Herkunft nur zweimal, damit keine Herkunfts-Sperre greift
            let herkunft = format!("10.0.0.{}", i / 2);
            sperre.fehlschlag_registrieren(&herkunft, "alice");
        }
        assert!(sperre.ist_gesperrt("192.168.0.99", "alice"));
    }

    #[test]
    fn ablauf_hebt_sperre_auf_und_nullt_zaehler() {
        let sperre = LoginSperre::neu(test_konfig(Duration::ZERO));
        for _ in 0..5 {
            sperre.fehlschlag_registrieren("10.0.0.5", "alice");
        }
        // Sperrdauer 0: der naechste Check verarbeitet den Ablauf
        assert!(!sperre.ist_gesperrt("10.0.0.5", "alice"));
        // Zaehler wurde genullt: vier weitere Fehlversuche sperren nicht
        for _ in 0..4 {
            sperre.fehlschlag_registrieren("10.0.0.5", "alice");
        }
        assert!(!sperre.ist_gesperrt("10.0.0.5", "alice"));
    }

    #[test]
    fn innerhalb_der_sperrdauer_bleibt_gesperrt() {
        let sperre = LoginSperre::neu(test_konfig(Duration::from_secs(3600)));
        for _ in 0..5 {
            sperre.fehlschlag_registrieren("10.0.0.5", "alice");
        }
        assert!(sperre.ist_gesperrt("10.0.0.5", "alice"));
        assert!(sperre.ist_gesperrt("10.0.0.5", "alice"));
    }

    #[test]
    fn erfolg_loescht_beide_eintraege_auch_bei_aktiver_sperre() {
        let sperre = LoginSperre::neu(test_konfig(Duration::from_secs(3600)));
        for _ in 0..10 {
            sperre.fehlschlag_registrieren("10.0.0.5", "alice");
        }
        assert!(sperre.ist_gesperrt("10.0.0.5", "alice"));

        sperre.erfolg_registrieren("10.0.0.5", "alice");
        assert!(!sperre.ist_gesperrt("10.0.0.5", "alice"));
        assert!(sperre.gesperrte_auflisten().is_empty());
    }

    #[test]
    fn auflistung_enthaelt_kennung_zaehler_und_ablauf() {
        let sperre = LoginSperre::neu(test_konfig(Duration::from_secs(60)));
        let vorher = Utc::now();
        for _ in 0..5 {
            sperre.fehlschlag_registrieren("10.0.0.9", "bob");
        }

        let eintraege = sperre.gesperrte_auflisten();
        assert_eq!(eintraege.len(), 1);
        let eintrag = &eintraege[0];
        assert_eq!(eintrag.kennung, "10.0.0.9");
        assert_eq!(eintrag.art, SperrArt::Herkunft);
        assert_eq!(eintrag.fehlversuche, 5);
        // gesperrt_bis = letzter Fehlversuch + Sperrdauer
        assert!(eintrag.gesperrt_bis >= vorher + chrono::Duration::seconds(60));
    }

    #[test]
    fn auflistung_ist_leer_ohne_sperren() {
        let sperre = LoginSperre::neu(SperrKonfig::default());
        sperre.fehlschlag_registrieren("10.0.0.5", "alice");
        assert!(sperre.gesperrte_auflisten().is_empty());
    }
}
