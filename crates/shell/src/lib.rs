//! torhaus-shell: Aufloesung, Autorisierung und Ausfuehrung von Befehlen
//!
//! Jede Eingabezeile durchlaeuft eine feste Pipeline: Parse →
//! Normalisieren → Validieren → Aufloesen → Autorisieren → Ausfuehren.
//! Der Dispatcher ist zustandslos und wird von allen Sitzungen geteilt;
//! Ausgabe laeuft ueber den abstrakten [`SitzungsKanal`], damit der
//! Transport austauschbar bleibt und Tests gegen einen Puffer laufen.

pub mod builtins;
pub mod dispatch;
pub mod error;
pub mod registry;
pub mod resolver;
pub mod session;

pub use builtins::standard_register;
pub use dispatch::{Dispatcher, SitzungsAktion};
pub use error::TokenFehler;
pub use registry::{BefehlsRegister, EingebauterBefehl};
pub use resolver::{
    basisname, kategorie_aufloesen, token_pruefen, BefehlsKategorie, BefehlsWurzeln,
    MAX_BEFEHLSLAENGE,
};
pub use session::{PufferKanal, SitzungsKanal, SitzungsKontext};
