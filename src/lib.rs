//! Sigil - render secret templates from an external vault CLI.
//!
//! # Architecture
//!
//! ```text
//! src/
//! ├── cli/              # Command-line interface
//! │   ├── inject        # Render one template (file or stdin)
//! │   ├── inject_all    # Batch render under template roots
//! │   ├── validate      # Parse-only report
//! │   ├── diff          # Rendered vs on-disk output
//! │   ├── run           # Run a command with a rendered dotenv template
//! │   ├── cache         # warm / clear / status
//! │   └── completions   # Shell completions
//! └── core/             # Core library components
//!     ├── config        # config.toml + SIGIL_* overrides
//!     ├── format        # Token grammars and detection
//!     ├── token         # Token extraction
//!     ├── reference     # Secret addresses, candidate accounts, cache keys
//!     ├── provider/     # SecretProvider trait, `op` CLI, static fake
//!     ├── resolver      # Account fallback chain
//!     ├── cache/        # TTL cache, memory and file stores
//!     ├── processor     # One template: render, diff, write
//!     ├── batch         # Discovery and worker pool
//!     ├── output        # Atomic writes, backups, binary sniffing
//!     ├── diff          # Line diff
//!     └── env           # Dotenv parsing for `run`
//! ```
//!
//! # Token grammars
//!
//! In detection order: `{{ op://vault/item/field }}`, `${NAME}`,
//! `{{NAME}}`, `%%NAME%%`, `$NAME`.

pub mod cli;
pub mod core;
pub mod error;
