//! Fehlertypen fuer torhaus-shell
//!
//! Kein Fehler in diesem Crate ist prozess-fatal: Ablehnungen werden als
//! Meldung in die Sitzung geschrieben und die Schleife laeuft weiter.

use thiserror::Error;

/// Ablehnung eines Befehls-Tokens vor jeder weiteren Verarbeitung
///
/// Die Display-Texte gehen woertlich an die Sitzung; sie sind die einzigen
/// Validierungsfehler mit spezifischer Meldung. IO- und Spawn-Fehler
/// erhalten dagegen nur eine generische Meldung, Details landen im Log.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TokenFehler {
    /// Token enthaelt Pfadtrenner oder Shell-Metazeichen
    #[error("Invalid or unsafe command")]
    Unsicher,

    /// Token ueberschreitet die Maximallaenge
    #[error("Command name too long")]
    ZuLang,
}
