//! KandidatenTekort.nl Lead API Library
//!
//! This library provides the backend for the kandidatentekort.nl lead funnel:
//! form-intake webhooks, AI vacancy analysis with a heuristic fallback,
//! report emails, CRM registration and server-side conversion tracking.
//!
//! # Modules
//!
//! - `analysis`: AI vacancy analysis and response normalization.
//! - `config`: Configuration management.
//! - `crm`: Pipedrive lead registration workflows.
//! - `email`: Analysis report rendering and delivery.
//! - `errors`: Error handling types.
//! - `facebook_handler`: Facebook Lead Ads webhook handler.
//! - `facebook_models`: Facebook webhook payload models.
//! - `handlers`: HTTP request handlers and shared state.
//! - `models`: Core data models.
//! - `scoring`: Heuristic vacancy scoring.
//! - `services`: External service clients (Claude, Pipedrive, Resend, Meta, GA4).
//! - `tracking`: Conversion event fan-out.
//! - `typeform_handler`: Typeform webhook handler.
//! - `typeform_models`: Typeform payload models.

pub mod analysis;
pub mod config;
pub mod crm;
pub mod email;
pub mod errors;
pub mod facebook_handler;
pub mod facebook_models;
pub mod handlers;
pub mod models;
pub mod scoring;
pub mod services;
pub mod tracking;
pub mod typeform_handler;
pub mod typeform_models;
