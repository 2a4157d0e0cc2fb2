//! Token-Normalisierung, Validierung und Kategorie-Aufloesung
//!
//! Das rohe Token wird zuerst auf seinen Basisnamen reduziert, dann
//! validiert und danach in fester Prioritaet aufgeloest: eingebauter
//! Befehl, dann Textdatei, dann ausfuehrbare Datei. Der erste Treffer
//! gewinnt; spaetere Kategorien werden nie konsultiert.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::TokenFehler;
use crate::registry::{BefehlsRegister, EingebauterBefehl};

/// Maximale Laenge eines Befehlsnamens in Bytes
pub const MAX_BEFEHLSLAENGE: usize = 64;

/// Blockierte Shell-Metazeichen
const METAZEICHEN: &[char] = &['&', '|', ';', '$', '`'];

/// Verzeichnis-Wurzeln fuer dateibasierte Befehle
#[derive(Debug, Clone)]
pub struct BefehlsWurzeln {
    /// Textdateien, deren Inhalt woertlich ausgegeben wird
    pub text: PathBuf,
    /// Ausfuehrbare Programme
    pub ausfuehrbar: PathBuf,
    /// Hilfethemen fuer den help-Befehl
    pub hilfe: PathBuf,
}

/// In welche Kategorie ein Befehlsname aufgeloest wurde
pub enum BefehlsKategorie {
    Eingebaut(Arc<dyn EingebauterBefehl>),
    TextAntwort(PathBuf),
    Ausfuehrbar(PathBuf),
    Unbekannt,
}

impl BefehlsKategorie {
    /// Kategoriename fuer Log-Eintraege
    pub fn name(&self) -> &'static str {
        match self {
            Self::Eingebaut(_) => "eingebaut",
            Self::TextAntwort(_) => "text",
            Self::Ausfuehrbar(_) => "ausfuehrbar",
            Self::Unbekannt => "unbekannt",
        }
    }
}

/// Reduziert ein rohes Token auf seinen Basisnamen
///
/// `../admin` wird zu `admin`, `foo/` zu `foo`. Besteht das Token nur
/// aus Trennern, bleibt `/` uebrig und faellt in der Validierung durch.
pub fn basisname(token: &str) -> &str {
    let getrimmt = token.trim_end_matches('/');
    if getrimmt.is_empty() {
        return "/";
    }
    getrimmt.rsplit('/').next().unwrap_or(getrimmt)
}

/// Validiert einen normalisierten Befehlsnamen
///
/// Lehnt Pfadtrenner, Shell-Metazeichen und Ueberlaenge ab, bevor
/// irgendein Dateisystemzugriff oder Prozessstart stattfindet.
pub fn token_pruefen(token: &str) -> Result<(), TokenFehler> {
    if token.contains('/') || token.contains('\\') || token.contains(METAZEICHEN) {
        return Err(TokenFehler::Unsicher);
    }
    if token.len() > MAX_BEFEHLSLAENGE {
        return Err(TokenFehler::ZuLang);
    }
    Ok(())
}

/// Loest einen Befehlsnamen als regulaere Datei unterhalb einer Wurzel auf
///
/// Liefert `None` wenn die Datei fehlt oder der aufgeloeste Pfad die
/// Wurzel verlaesst; die Aufloesung schlaegt geschlossen fehl.
pub fn datei_in_wurzel(wurzel: &Path, name: &str) -> Option<PathBuf> {
    let wurzel_abs = std::fs::canonicalize(wurzel).ok()?;
    let kandidat = std::fs::canonicalize(wurzel.join(name)).ok()?;
    if !kandidat.starts_with(&wurzel_abs) {
        return None;
    }
    if !kandidat.is_file() {
        return None;
    }
    Some(kandidat)
}

/// Wie [`datei_in_wurzel`], verlangt zusaetzlich mindestens ein Execute-Bit
pub fn ausfuehrbare_in_wurzel(wurzel: &Path, name: &str) -> Option<PathBuf> {
    use std::os::unix::fs::PermissionsExt;

    let pfad = datei_in_wurzel(wurzel, name)?;
    let metadaten = std::fs::metadata(&pfad).ok()?;
    if metadaten.permissions().mode() & 0o111 == 0 {
        return None;
    }
    Some(pfad)
}

/// Loest einen validierten Befehlsnamen in seine Kategorie auf
pub fn kategorie_aufloesen(
    name: &str,
    register: &BefehlsRegister,
    wurzeln: &BefehlsWurzeln,
) -> BefehlsKategorie {
    if let Some(befehl) = register.finde(name) {
        return BefehlsKategorie::Eingebaut(befehl);
    }
    if let Some(pfad) = datei_in_wurzel(&wurzeln.text, name) {
        return BefehlsKategorie::TextAntwort(pfad);
    }
    if let Some(pfad) = ausfuehrbare_in_wurzel(&wurzeln.ausfuehrbar, name) {
        return BefehlsKategorie::Ausfuehrbar(pfad);
    }
    BefehlsKategorie::Unbekannt
}
