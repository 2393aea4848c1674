//! A handle-based JavaScript embedding API on top of an exact-rooting engine.
//!
//! Host code written against the familiar isolate / handle-scope / local-handle model runs on the
//! small precise-GC engine in [`engine`]. The bridge provides:
//! - Isolates that own one engine context and a pending exception slot ([`Isolate`])
//! - Stack-disciplined rooting scopes ([`HandleScope`], [`EscapableHandleScope`])
//! - Copyable, typed handles into the rooting stack ([`Local`])
//! - Exception-free results for fallible operations ([`MaybeLocal`], [`Maybe`])
//! - Construction operations for strings, numbers, objects and arrays
//! - Handles that outlive scopes ([`Persistent`]) and error objects ([`Exception`], [`TryCatch`])
//!
//! # Rooting
//!
//! The engine collector only sees values registered on its rooting stack or in its persistent root
//! table. Every construction operation allocates through the engine, roots the result in the
//! innermost [`HandleScope`] before anything else can allocate, and only then wraps it as a
//! [`Local`]. Exiting the scope releases all of its slots together.
//!
//! A `Local` is a `{ stack, index, generation }` reference into the rooting stack. Using it after
//! its scope has exited panics; the generation counter catches the case where the slot index was
//! reused by a later scope. Using it with a different isolate panics as well.
//!
//! # Failure channels
//!
//! Allocation failure is reported as an empty [`MaybeLocal`] or [`Maybe`] and never touches the
//! isolate's pending exception. The pending exception is set only by
//! [`HandleScope::throw_exception`]. Contract violations (dereferencing an empty or expired handle,
//! exiting scopes out of order, unsupported construction modes) panic.
//!
//! ```
//! use shim_js::{CreateParams, HandleScope, Isolate, NewStringType, String};
//!
//! let isolate = Isolate::new(CreateParams::default()).unwrap();
//! {
//!   let scope = HandleScope::new(&isolate);
//!   let s = String::new_from_utf8(&scope, b"hi\0ignored", NewStringType::Normal, -1)
//!     .to_local()
//!     .unwrap();
//!   assert_eq!(s.to_rust_string_lossy(&scope), "hi");
//! }
//! isolate.dispose();
//! ```

mod data;
pub mod engine;
mod error;
mod exception;
mod isolate;
mod local;
mod maybe;
mod object;
mod persistent;
mod primitives;
mod scope;
mod string;

pub use crate::data::Array;
pub use crate::data::Boolean;
pub use crate::data::Integer;
pub use crate::data::Number;
pub use crate::data::Object;
pub use crate::data::Primitive;
pub use crate::data::String;
pub use crate::data::Value;
pub use crate::data::ValueKind;
pub use crate::engine::HeapLimits;
pub use crate::error::ShimError;
pub use crate::exception::Exception;
pub use crate::exception::TryCatch;
pub use crate::isolate::CreateParams;
pub use crate::isolate::HeapStatistics;
pub use crate::isolate::Isolate;
pub use crate::local::Local;
pub use crate::maybe::Maybe;
pub use crate::maybe::MaybeLocal;
pub use crate::persistent::Persistent;
pub use crate::primitives::null;
pub use crate::primitives::undefined;
pub use crate::scope::EscapableHandleScope;
pub use crate::scope::HandleScope;
pub use crate::string::NewStringType;
