//! Sitzungs-Abstraktion fuer Dispatcher und eingebaute Befehle
//!
//! Ausgaben werden vollstaendig gepuffert und erst nach Abschluss einer
//! Zeile an den Transport weitergereicht; Streaming ist bewusst nicht
//! vorgesehen.

use torhaus_auth::Benutzer;

/// Ausgabekanal einer Sitzung
///
/// Schreiben kann nicht fehlschlagen: Implementierungen puffern, der
/// Transport leert den Puffer nach der verarbeiteten Zeile.
pub trait SitzungsKanal: Send {
    /// Schreibt Bytes in die Sitzungsausgabe
    fn schreiben(&mut self, daten: &[u8]);

    /// Markiert die Sitzung als zu beenden (z.B. durch den exit-Befehl)
    fn beenden(&mut self);

    /// Wurde die Sitzung zum Beenden markiert?
    fn ist_beendet(&self) -> bool;

    /// Schreibt eine Textzeile inklusive Zeilenumbruch
    fn zeile_schreiben(&mut self, text: &str) {
        self.schreiben(text.as_bytes());
        self.schreiben(b"\n");
    }
}

/// Kontext in dem ein Befehl ausgefuehrt wird: wer, von wo
#[derive(Debug, Clone)]
pub struct SitzungsKontext {
    pub benutzer: Benutzer,
    /// Herkunfts-Kennung der Verbindung (Peer-IP)
    pub herkunft: String,
}

/// Gepufferter Kanal – Standard-Implementierung fuer Transport und Tests
#[derive(Debug, Default)]
pub struct PufferKanal {
    puffer: Vec<u8>,
    beendet: bool,
}

impl PufferKanal {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Entnimmt den gesamten gepufferten Inhalt
    pub fn entnehmen(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.puffer)
    }

    /// Blick auf den Puffer ohne Entnahme (fuer Tests)
    pub fn inhalt(&self) -> &[u8] {
        &self.puffer
    }
}

impl SitzungsKanal for PufferKanal {
    fn schreiben(&mut self, daten: &[u8]) {
        self.puffer.extend_from_slice(daten);
    }

    fn beenden(&mut self) {
        self.beendet = true;
    }

    fn ist_beendet(&self) -> bool {
        self.beendet
    }
}
