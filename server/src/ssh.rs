//! SSH-Transport auf Basis von russh
//!
//! Jede eingehende Verbindung bekommt eine eigene [`SshSitzung`]:
//! Authentifizierung laeuft ueber das AuthGate, danach liest die Sitzung
//! Zeilen aus dem Kanal, reicht sie einzeln an den Dispatcher weiter und
//! schreibt die gepufferte Antwort zurueck. Zeilen werden strikt
//! sequenziell verarbeitet; die Sitzungsschleife selbst ist der einzige
//! Konsument ihres Kanals.

use std::net::SocketAddr;
use std::sync::Arc;

use russh::server::{Auth, Handler, Msg, Session};
use russh::{Channel, ChannelId, CryptoVec};
use russh_keys::key::PublicKey;
use russh_keys::PublicKeyBase64;
use torhaus_auth::{Anmeldeversuch, AuthGate, Benutzer};
use torhaus_shell::{Dispatcher, PufferKanal, SitzungsAktion, SitzungsKontext};
use uuid::Uuid;

/// Geteilter Zustand aller SSH-Sitzungen
pub struct GatewayZustand {
    pub gate: Arc<AuthGate>,
    pub dispatcher: Arc<Dispatcher>,
}

/// Nimmt Verbindungen an und erzeugt pro Client eine Sitzung
pub struct SshServer {
    zustand: Arc<GatewayZustand>,
}

impl SshServer {
    pub fn neu(zustand: Arc<GatewayZustand>) -> Self {
        Self { zustand }
    }
}

impl russh::server::Server for SshServer {
    type Handler = SshSitzung;

    fn new_client(&mut self, peer_addr: Option<SocketAddr>) -> Self::Handler {
        tracing::debug!(peer = ?peer_addr, "Neue SSH-Verbindung");
        SshSitzung::neu(Arc::clone(&self.zustand), peer_addr)
    }
}

/// Zustand einer einzelnen SSH-Verbindung
pub struct SshSitzung {
    zustand: Arc<GatewayZustand>,
    /// Eindeutige Kennung der Verbindung fuer das Log
    sitzungs_id: Uuid,
    /// Herkunfts-IP ohne Port; Kennung fuer den Login-Limiter
    herkunft: String,
    /// Nach erfolgreicher Authentifizierung gesetzt
    benutzer: Option<Benutzer>,
    /// Zeilenpuffer fuer die minimale Eingabesammlung mit Echo
    zeile: Vec<u8>,
}

impl SshSitzung {
    fn neu(zustand: Arc<GatewayZustand>, peer_addr: Option<SocketAddr>) -> Self {
        let herkunft = peer_addr
            .map(|adresse| adresse.ip().to_string())
            .unwrap_or_else(|| "unbekannt".into());
        Self {
            zustand,
            sitzungs_id: Uuid::new_v4(),
            herkunft,
            benutzer: None,
            zeile: Vec::new(),
        }
    }

    fn prompt(&self) -> String {
        self.benutzer
            .as_ref()
            .and_then(|benutzer| benutzer.prompt.clone())
            .unwrap_or_else(|| "> ".into())
    }

    fn senden(session: &mut Session, channel: ChannelId, daten: &[u8]) {
        if !daten.is_empty() {
            session.data(channel, CryptoVec::from_slice(daten));
        }
    }

    /// Beendet den Kanal in der von RFC 4254 erwarteten Reihenfolge
    fn kanal_schliessen(session: &mut Session, channel: ChannelId, status: u32) {
        session.exit_status_request(channel, status);
        session.eof(channel);
        session.close(channel);
    }

    /// Verarbeitet eine komplette Eingabezeile ueber den Dispatcher
    ///
    /// Die Antwort wird gepuffert gesammelt und erst nach Abschluss des
    /// Befehls in den Kanal geschrieben.
    async fn zeile_ausfuehren(&mut self, channel: ChannelId, session: &mut Session) {
        let zeile = String::from_utf8_lossy(&self.zeile).into_owned();
        self.zeile.clear();

        let Some(benutzer) = self.benutzer.clone() else {
            // Shell ohne abgeschlossene Authentifizierung gibt es nicht
            Self::kanal_schliessen(session, channel, 1);
            return;
        };
        let kontext = SitzungsKontext {
            benutzer,
            herkunft: self.herkunft.clone(),
        };

        let mut kanal = PufferKanal::neu();
        let aktion = self
            .zustand
            .dispatcher
            .zeile_verarbeiten(&zeile, &mut kanal, &kontext)
            .await;

        Self::senden(session, channel, &fuer_terminal(kanal.inhalt()));

        match aktion {
            SitzungsAktion::Beenden => Self::kanal_schliessen(session, channel, 0),
            SitzungsAktion::Weiter => {
                Self::senden(session, channel, self.prompt().as_bytes());
            }
        }
    }
}

#[async_trait::async_trait]
impl Handler for SshSitzung {
    type Error = anyhow::Error;

    async fn auth_password(
        &mut self,
        user: &str,
        password: &str,
    ) -> Result<Auth, Self::Error> {
        let versuch = Anmeldeversuch::Passwort {
            username: user,
            passwort: password,
        };
        match self.zustand.gate.anmelden(&self.herkunft, versuch) {
            Ok(benutzer) => {
                self.benutzer = Some(benutzer);
                Ok(Auth::Accept)
            }
            Err(_) => Ok(Auth::Reject {
                proceed_with_methods: None,
            }),
        }
    }

    async fn auth_publickey(
        &mut self,
        user: &str,
        key: &PublicKey,
    ) -> Result<Auth, Self::Error> {
        // Kanonische authorized_keys-Zeile, gegen die der Datenbestand vergleicht
        let schluessel = format!("{} {}", key.name(), key.public_key_base64());
        let versuch = Anmeldeversuch::PublicKey {
            username: user,
            schluessel: &schluessel,
        };
        match self.zustand.gate.anmelden(&self.herkunft, versuch) {
            Ok(benutzer) => {
                self.benutzer = Some(benutzer);
                Ok(Auth::Accept)
            }
            Err(_) => Ok(Auth::Reject {
                proceed_with_methods: None,
            }),
        }
    }

    async fn channel_open_session(
        &mut self,
        _channel: Channel<Msg>,
        _session: &mut Session,
    ) -> Result<bool, Self::Error> {
        Ok(true)
    }

    async fn pty_request(
        &mut self,
        channel: ChannelId,
        _term: &str,
        _col_width: u32,
        _row_height: u32,
        _pix_width: u32,
        _pix_height: u32,
        _modes: &[(russh::Pty, u32)],
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        session.channel_success(channel);
        Ok(())
    }

    /// Startet die interaktive Shell: Begruessung, Hinweiszeile, Prompt
    async fn shell_request(
        &mut self,
        channel: ChannelId,
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        let Some(benutzer) = self.benutzer.as_ref() else {
            session.channel_failure(channel);
            return Ok(());
        };

        tracing::info!(
            sitzung = %self.sitzungs_id,
            benutzer = %benutzer.username,
            herkunft = %self.herkunft,
            "Shell-Sitzung gestartet"
        );

        let begruessung = benutzer
            .banner
            .clone()
            .unwrap_or_else(|| format!("Welcome {}!", benutzer.username));
        let mut kopf = String::new();
        kopf.push_str(&begruessung);
        kopf.push('\n');
        kopf.push_str("Type 'help' to see available commands.\n\n");
        kopf.push_str(&self.prompt());

        session.channel_success(channel);
        Self::senden(session, channel, &fuer_terminal(kopf.as_bytes()));
        Ok(())
    }

    /// Exec-Requests werden nicht bedient; das Gateway ist rein interaktiv
    async fn exec_request(
        &mut self,
        channel: ChannelId,
        _data: &[u8],
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        session.channel_failure(channel);
        Ok(())
    }

    /// Minimale Zeilensammlung mit Echo
    ///
    /// Behandelt Enter, Backspace, Ctrl-C und Ctrl-D; alles andere wird
    /// woertlich in den Zeilenpuffer uebernommen und zurueckgespiegelt.
    async fn data(
        &mut self,
        channel: ChannelId,
        data: &[u8],
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        for &byte in data {
            match byte {
                b'\r' | b'\n' => {
                    Self::senden(session, channel, b"\r\n");
                    self.zeile_ausfuehren(channel, session).await;
                }
                // Backspace / Delete
                0x08 | 0x7f => {
                    if self.zeile.pop().is_some() {
                        Self::senden(session, channel, b"\x08 \x08");
                    }
                }
                // Ctrl-C verwirft die aktuelle Zeile
                0x03 => {
                    self.zeile.clear();
                    let antwort = format!("^C\r\n{}", self.prompt());
                    Self::senden(session, channel, antwort.as_bytes());
                }
                // Ctrl-D auf leerer Zeile beendet die Sitzung
                0x04 => {
                    if self.zeile.is_empty() {
                        Self::senden(session, channel, b"\r\n");
                        Self::kanal_schliessen(session, channel, 0);
                    }
                }
                _ => {
                    self.zeile.push(byte);
                    Self::senden(session, channel, &[byte]);
                }
            }
        }
        Ok(())
    }
}

/// Uebersetzt gepufferte Ausgabe in Terminal-Zeilenenden (`\n` → `\r\n`)
fn fuer_terminal(daten: &[u8]) -> Vec<u8> {
    let mut ausgabe = Vec::with_capacity(daten.len());
    for &byte in daten {
        if byte == b'\n' {
            ausgabe.push(b'\r');
        }
        ausgabe.push(byte);
    }
    ausgabe
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fuer_terminal_ergaenzt_wagenruecklauf() {
        assert_eq!(fuer_terminal(b"a\nb\n"), b"a\r\nb\r\n");
        assert_eq!(fuer_terminal(b"ohne"), b"ohne");
        assert_eq!(fuer_terminal(b""), b"");
    }
}
