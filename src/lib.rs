pub mod accounts;
pub mod api;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod content_generator;
pub mod content_store;
pub mod controller;
pub mod errors;
pub mod grading;
pub mod json_parser;
pub mod llm_providers;
pub mod logging;
pub mod models;
pub mod session;
pub mod storage;
pub mod timer;

pub use accounts::{AuthError, LocalAccounts};
pub use content_generator::{ContentGenerator, GeneratedTest, GenerationError, GenerationRequest, Reconciliation};
pub use content_store::ContentStore;
pub use controller::{Command, ControllerHandle, GameController};
pub use errors::*;
pub use grading::GradingEngine;
pub use json_parser::{JsonResponseParser, ParseStrategy};
pub use llm_providers::{GeminiProvider, LLMError, LLMProviderFactory, LLMProviderType, ProxyClient, TextGenerator};
pub use models::*;
pub use session::{Action, Effect, Phase, Session, SessionSnapshot, TimerPhase};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
