//! Register der eingebauten Befehle
//!
//! Explizites Objekt statt globaler Tabelle: wird beim Start aufgebaut
//! und in den Dispatcher injiziert, sodass Tests es austauschen koennen.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::session::{SitzungsKanal, SitzungsKontext};

/// Ein eingebauter Befehl
///
/// Darf beliebig in den Kanal schreiben und die Sitzung beenden.
#[async_trait]
pub trait EingebauterBefehl: Send + Sync {
    async fn ausfuehren(
        &self,
        kanal: &mut dyn SitzungsKanal,
        kontext: &SitzungsKontext,
        args: &[String],
    );

    /// Nur fuer Benutzer mit Admin-Flag ausfuehrbar
    fn nur_admin(&self) -> bool {
        false
    }
}

/// Register aller eingebauten Befehle: Name → Handler
///
/// Eingebaute Befehle haben bei der Aufloesung Prioritaet vor Text- und
/// externen Befehlen; spaetere Kategorien werden nie konsultiert.
#[derive(Default)]
pub struct BefehlsRegister {
    befehle: HashMap<String, Arc<dyn EingebauterBefehl>>,
}

impl BefehlsRegister {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Registriert einen Befehl unter seinem Namen
    pub fn registrieren(&mut self, name: &str, befehl: Arc<dyn EingebauterBefehl>) {
        self.befehle.insert(name.to_string(), befehl);
    }

    /// Schlaegt einen Befehl nach Namen nach (exakt, case-sensitiv)
    pub fn finde(&self, name: &str) -> Option<Arc<dyn EingebauterBefehl>> {
        self.befehle.get(name).cloned()
    }

    pub fn enthaelt(&self, name: &str) -> bool {
        self.befehle.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::PufferKanal;
    use torhaus_auth::Benutzer;

    struct EchoBefehl;

    #[async_trait]
    impl EingebauterBefehl for EchoBefehl {
        async fn ausfuehren(
            &self,
            kanal: &mut dyn SitzungsKanal,
            _kontext: &SitzungsKontext,
            args: &[String],
        ) {
            kanal.zeile_schreiben(&args.join(" "));
        }
    }

    fn test_kontext() -> SitzungsKontext {
        SitzungsKontext {
            benutzer: Benutzer {
                username: "bob".into(),
                hash: String::new(),
                admin: false,
                restrict: String::new(),
                allowed: vec![],
                pubkeys: vec![],
                prompt: None,
                banner: None,
            },
            herkunft: "127.0.0.1".into(),
        }
    }

    #[test]
    fn register_findet_nur_exakte_namen() {
        let mut register = BefehlsRegister::neu();
        register.registrieren("echo", Arc::new(EchoBefehl));
        assert!(register.enthaelt("echo"));
        assert!(!register.enthaelt("Echo"));
        assert!(!register.enthaelt("ech"));
    }

    #[tokio::test]
    async fn registrierter_befehl_ist_ausfuehrbar() {
        let mut register = BefehlsRegister::neu();
        register.registrieren("echo", Arc::new(EchoBefehl));

        let befehl = register.finde("echo").expect("echo fehlt");
        let mut kanal = PufferKanal::neu();
        befehl
            .ausfuehren(&mut kanal, &test_kontext(), &["a".into(), "b".into()])
            .await;
        assert_eq!(kanal.inhalt(), b"a b\n");
    }
}
