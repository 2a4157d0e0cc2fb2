//! torhaus-server – Bibliotheks-Root
//!
//! Deklariert alle Server-Module und stellt den oeffentlichen Einstiegspunkt
//! fuer Integrationstests bereit.

pub mod config;
pub mod hostkey;
pub mod ssh;

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use russh::server::Server as _;
use russh::MethodSet;

use config::ServerConfig;
use ssh::{GatewayZustand, SshServer};
use torhaus_auth::{AuthGate, BenutzerRegister, LoginSperre};
use torhaus_shell::{standard_register, Dispatcher};

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet den SSH-Listener und laeuft bis zum Shutdown-Signal
    ///
    /// Reihenfolge:
    /// 1. Benutzerdatenbank laden (Fehler ist fatal)
    /// 2. Hostschluessel laden oder erzeugen
    /// 3. Login-Limiter, AuthGate und Dispatcher verdrahten
    /// 4. SSH-Listener starten
    /// 5. Auf Ctrl-C warten
    pub async fn starten(self) -> Result<()> {
        let register = BenutzerRegister::laden(Path::new(&self.config.server.benutzer_datei))
            .with_context(|| {
                format!(
                    "Benutzerdatenbank '{}' konnte nicht geladen werden",
                    self.config.server.benutzer_datei
                )
            })?;
        let register = Arc::new(register);

        let hostschluessel =
            hostkey::laden_oder_erzeugen(Path::new(&self.config.server.hostkey_datei))?;

        let sperre = LoginSperre::neu(self.config.sperr_konfig());
        let gate = AuthGate::neu(Arc::clone(&register), Arc::clone(&sperre));

        let wurzeln = self.config.befehls_wurzeln();
        let befehle = standard_register(Arc::clone(&sperre), wurzeln.hilfe.clone());
        let dispatcher = Dispatcher::neu(Arc::new(befehle), wurzeln, self.config.exec_limit());

        let zustand = Arc::new(GatewayZustand { gate, dispatcher });

        let inaktivitaet = match self.config.netzwerk.inaktivitaet_sekunden {
            0 => None,
            sekunden => Some(Duration::from_secs(sekunden)),
        };
        let russh_config = Arc::new(russh::server::Config {
            server_id: russh::SshId::Standard(self.config.server.banner.clone()),
            keys: vec![hostschluessel],
            methods: MethodSet::PASSWORD | MethodSet::PUBLICKEY,
            inactivity_timeout: inaktivitaet,
            auth_rejection_time: Duration::from_secs(1),
            auth_rejection_time_initial: Some(Duration::from_secs(0)),
            ..Default::default()
        });

        let adresse: SocketAddr = self
            .config
            .ssh_bind_adresse()
            .parse()
            .with_context(|| format!("Ungueltige Bind-Adresse: {}", self.config.ssh_bind_adresse()))?;

        tracing::info!(
            adresse = %adresse,
            banner = %self.config.server.banner,
            "SSH-Listener startet"
        );

        let mut ssh_server = SshServer::neu(zustand);
        tokio::select! {
            ergebnis = ssh_server.run_on_address(russh_config, adresse) => {
                ergebnis.context("SSH-Listener unerwartet beendet")?;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown-Signal empfangen, Server wird beendet");
            }
        }

        Ok(())
    }
}
