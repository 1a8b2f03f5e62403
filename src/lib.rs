//! # DocQ
//!
//! An async client and CLI for document question-answering (RAG) backends.
//!
//! DocQ talks to a backend that owns the heavy lifting — chunking,
//! embedding, vector storage, and retrieval-augmented answering — and gives
//! you the client side: projects, per-project knowledge bases, background
//! processing tasks, and a conversation whose answers cite source passages.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌────────────────────┐   ┌─────────────┐
//! │   CLI    │──▶│ Feeds               │──▶│  ApiClient   │──▶ Backend API
//! │ (docq)   │   │ store+poller+       │   │ reqwest +   │    (REST/JSON,
//! └──────────┘   │ reconciler per      │   │ bearer auth │     bearer token)
//!                │ collection          │   └─────────────┘
//!                └────────────────────┘
//! ```
//!
//! Three small pieces carry all the asynchronous behavior, and every feed
//! is built from them instead of rolling its own timer logic:
//!
//! - [`store::ResourceStore`] — insertion-ordered in-memory cache of one
//!   entity collection with pure mutators.
//! - [`poller::Poller`] — interval-driven re-fetch, active only while the
//!   tracked resource is in a non-terminal state; at most one timer per
//!   poller, overlapping fetches impossible.
//! - [`reconcile`] — optimistic-update protocol: show a pending entity
//!   immediately, swap it for the server's answer, or flag it failed.
//!
//! ## Quick Start
//!
//! ```bash
//! docq signup --name Ada --username ada --email ada@example.com --password s3cret
//! docq login --username ada --password s3cret
//! docq project create "Docs"
//! docq docs upload <project-id> intro.pdf appendix.pdf
//! docq process start <project-id> --watch
//! docq chat send <project-id> "What is X?"
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | API error taxonomy |
//! | [`models`] | Core data types |
//! | [`session`] | Bearer-token lifecycle |
//! | [`client`] | Backend API client |
//! | [`store`] | In-memory resource store |
//! | [`poller`] | Interval polling with start/stop lifecycle |
//! | [`reconcile`] | Optimistic-update reconciliation |
//! | [`lifecycle`] | Project state machine and stage sources |
//! | [`progress`] | Watch-mode progress reporting |
//! | [`projects`], [`documents`], [`messages`], [`task`], [`health`] | Per-collection feeds and CLI commands |

pub mod client;
pub mod config;
pub mod documents;
pub mod error;
pub mod health;
pub mod lifecycle;
pub mod messages;
pub mod models;
pub mod poller;
pub mod progress;
pub mod projects;
pub mod reconcile;
pub mod session;
pub mod store;
pub mod task;
