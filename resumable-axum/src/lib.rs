//! resumable-axum: Axum adapter for resumable-core.
//!
//! Turns HTTP requests into the flat parameter map and byte payload the
//! engine consumes, and renders its outcomes as resumable.js status codes:
//!
//! | call   | outcome                 | status |
//! |--------|-------------------------|--------|
//! | probe  | have chunk              | 200    |
//! | probe  | need chunk              | 204    |
//! | either | missing/invalid params  | 422    |
//! | upload | accepted or completed   | 201    |
//! | upload | storage failure         | 500    |
//! | upload | oversized or bad body   | 4xx    |

pub mod app;
pub mod params;
pub mod state;
pub mod upload;

pub use state::ResumableState;
pub use upload::{
    upload_router, upload_router_with_limit, OutcomeResponse, DEFAULT_BODY_LIMIT,
};

pub use app::{axum, AxumApp};
