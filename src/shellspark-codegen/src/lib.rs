//! Shell command emitters, pipeline assembler and compile cache for
//! ShellSpark.
//!
//! Four cooperating emitters each own one utility: AWK for field-aware
//! csv/text work, the grep family for raw-line predicates, jq for json, and
//! the sort family for ordering, deduplication and limiting. The assembler
//! binds an optimized plan to the tools discovered on the host, joins the
//! emitted fragments with pipes and memoizes the result keyed by plan hash
//! and tool fingerprint.
//!
//! Every dynamic value entering the command line is escaped with a POSIX
//! single-quote discipline; patterns, paths and column names are always
//! data, never syntax.

pub mod assemble;
pub mod awk;
mod cache;
mod compiler;
pub mod fragment;
pub mod grep;
pub mod jq;
pub mod quote;
pub mod sortcmd;

pub use assemble::Assembler;
pub use cache::{CacheKey, CompileCache, DEFAULT_CACHE_CAPACITY};
pub use compiler::Compiler;
pub use fragment::{Fragment, Layout};
pub use quote::{sh_quote, sh_quote_always};
