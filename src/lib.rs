//! WebDriver-driven E2E suite for the webmail login flow.
//!
//! The suite drives a real browser through the login/logout state machine
//! and verifies the visible UI plus the identity API:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  SuiteRunner                                             │
//! │    ├── Scenario (declarative YAML / built-in matrix)     │
//! │    ├── AuthFixture (login once, reuse persisted cookies) │
//! │    └── per scenario: isolated Session                    │
//! ├──────────────────────────────────────────────────────────┤
//! │  LoginPage                                               │
//! │    ├── fill_form / submit                                │
//! │    ├── await_outcome: authenticated XOR error shown      │
//! │    └── logout / verify_* checks                          │
//! ├──────────────────────────────────────────────────────────┤
//! │  Session (base page primitives)                          │
//! │    ├── navigate with retry + backoff                     │
//! │    ├── visibility waits, validated fills, settlement     │
//! │    └── screenshots, cookie persistence, API calls        │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! The browser itself is external: the suite speaks WebDriver to whatever
//! chromedriver/geckodriver endpoint `WEBDRIVER_URL` points at.

pub mod config;
pub mod error;
pub mod fixture;
pub mod identity;
pub mod pages;
pub mod runner;
pub mod scenario;
pub mod session;

pub use config::{Config, Credentials, Role};
pub use error::{E2eError, E2eResult};
pub use fixture::AuthFixture;
pub use pages::{LoginOutcome, LoginPage};
pub use runner::{SuiteResult, SuiteRunner};
pub use scenario::Scenario;
pub use session::Session;
