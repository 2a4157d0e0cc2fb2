//! Hostschluessel-Verwaltung
//!
//! Stellt sicher, dass unter dem konfigurierten Pfad ein ed25519-
//! Hostschluessel liegt: vorhandene Schluessel werden geladen, fehlende
//! erzeugt und persistiert, damit Clients ueber Neustarts hinweg
//! denselben Fingerprint sehen.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use russh_keys::key::KeyPair;
use russh_keys::PublicKeyBase64;

/// Laedt den Hostschluessel oder erzeugt und speichert einen neuen
pub fn laden_oder_erzeugen(pfad: &Path) -> Result<KeyPair> {
    if !pfad.exists() {
        tracing::info!(
            pfad = %pfad.display(),
            "Hostschluessel nicht gefunden, erzeuge neuen ed25519-Schluessel"
        );
        erzeugen_und_speichern(pfad)?;
    }

    let schluessel = russh_keys::load_secret_key(pfad, None)
        .with_context(|| format!("Hostschluessel '{}' nicht lesbar", pfad.display()))?;

    let oeffentlich = schluessel.clone_public_key()?;
    tracing::info!(
        pfad = %pfad.display(),
        fingerprint = %oeffentlich.fingerprint(),
        "Hostschluessel geladen"
    );

    Ok(schluessel)
}

/// Erzeugt einen ed25519-Schluessel und schreibt ihn PEM-kodiert auf die Platte
///
/// Der private Schluessel bekommt Modus 0600; der oeffentliche Teil wird
/// zusaetzlich als `<pfad>.pub` im authorized-keys-Format abgelegt.
fn erzeugen_und_speichern(pfad: &Path) -> Result<()> {
    let schluessel = KeyPair::generate_ed25519();

    let mut pem = Vec::new();
    russh_keys::encode_pkcs8_pem(&schluessel, &mut pem)
        .context("Hostschluessel konnte nicht kodiert werden")?;

    let mut datei = privat_oeffnen(pfad)
        .with_context(|| format!("Hostschluessel '{}' nicht schreibbar", pfad.display()))?;
    datei.write_all(&pem)?;

    // Oeffentlicher Teil nur zur Referenz; ein Fehlschlag ist nicht fatal
    let oeffentlich = schluessel.clone_public_key()?;
    let pub_pfad = pfad.with_extension("pub");
    let zeile = format!("{} {}\n", oeffentlich.name(), oeffentlich.public_key_base64());
    if let Err(fehler) = std::fs::write(&pub_pfad, zeile) {
        tracing::warn!(
            pfad = %pub_pfad.display(),
            %fehler,
            "Oeffentlicher Hostschluessel konnte nicht geschrieben werden"
        );
    }

    tracing::info!(pfad = %pfad.display(), "Neuer Hostschluessel erzeugt");
    Ok(())
}

#[cfg(unix)]
fn privat_oeffnen(pfad: &Path) -> std::io::Result<std::fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(pfad)
}

#[cfg(not(unix))]
fn privat_oeffnen(pfad: &Path) -> std::io::Result<std::fs::File> {
    std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(pfad)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn erzeugt_und_laedt_denselben_schluessel() {
        let verzeichnis = tempfile::tempdir().expect("Temp-Verzeichnis");
        let pfad = verzeichnis.path().join("host_key");

        let erster = laden_oder_erzeugen(&pfad).expect("Erzeugen");
        assert!(pfad.exists());
        assert!(pfad.with_extension("pub").exists());

        // Zweiter Aufruf laedt den persistierten Schluessel statt neu zu erzeugen
        let zweiter = laden_oder_erzeugen(&pfad).expect("Laden");
        let fp1 = erster.clone_public_key().expect("Public Key").fingerprint();
        let fp2 = zweiter.clone_public_key().expect("Public Key").fingerprint();
        assert_eq!(fp1, fp2);
    }

    #[cfg(unix)]
    #[test]
    fn privater_schluessel_ist_nur_fuer_den_eigentuemer_lesbar() {
        use std::os::unix::fs::PermissionsExt;

        let verzeichnis = tempfile::tempdir().expect("Temp-Verzeichnis");
        let pfad = verzeichnis.path().join("host_key");
        laden_oder_erzeugen(&pfad).expect("Erzeugen");

        let modus = std::fs::metadata(&pfad).expect("Metadaten").permissions().mode();
        assert_eq!(modus & 0o777, 0o600);
    }
}
