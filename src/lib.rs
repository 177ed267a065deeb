//! # tex-parser
//!
//! A backtracking recursive-descent parser for LaTeX-like documents.
//!
//! File Layout
//!
//! Everything lives under [`tex`]. The generic pieces (the arena [tree](tex::tree), the
//! [parsing context](tex::context) and the [engine](tex::engine)) know nothing about LaTeX;
//! the vocabulary comes from a [definition registry](tex::definitions) and the
//! [LaTeX dispatcher](tex::latex) that drives the engine with it.
//!
//! src/tex
//!   ├── tree, context, engine, modes     Generic parsing machinery
//!   ├── definitions                      Symbols, commands and environments, loaded as packages
//!   ├── latex                            Dispatch rules and steps
//!   └── loader, snapshot, testing        Entry point and test helpers
//!
//! ```rust,ignore
//! use tex_parser::tex::loader::DocumentLoader;
//!
//! let doc = DocumentLoader::from_string(r"\section{Intro} Hello").parse()?;
//! println!("{}", doc.snapshot().render());
//! ```

pub mod tex;
