//! Symbol table loading and address resolution (spec §4.7, component C10).
//!
//! Two loaders feed the same [`SymbolTable`]: a native ELF `.symtab` reader
//! built on `object`/`memmap2` (matching
//! `examples/mstange-samply`'s `kernel_symbols::kernel_module_build_id`), and
//! a hand-rolled `System.map`-style text parser, kept hand-rolled because the
//! original's own `kallsyms`-style loader is hand-rolled too and the format
//! is a handful of whitespace-delimited columns, not worth a crate.

use std::fs::File;
use std::path::Path;

use object::{Object, ObjectSymbol, SymbolKind};

/// One resolved symbol: start address, optional size (0 means unknown, as
/// produced by the `System.map` loader), and name.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub addr: usize,
    pub size: usize,
    pub name: String,
}

/// Address-sorted symbol table supporting nearest-below lookup.
#[derive(Debug, Default)]
pub struct SymbolTable {
    entries: Vec<Symbol>,
}

impl SymbolTable {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.entries.iter()
    }

    fn from_unsorted(mut entries: Vec<Symbol>) -> Self {
        entries.sort_by_key(|s| s.addr);
        SymbolTable { entries }
    }

    /// Finds the symbol whose range contains `addr`: the nearest entry with
    /// `addr_entry <= addr`, rejected if its (known) size doesn't reach that
    /// far (spec §4.7, "nearest-below with a size bound").
    pub fn resolve(&self, addr: usize) -> Option<&Symbol> {
        let idx = self.entries.partition_point(|s| s.addr <= addr);
        if idx == 0 {
            return None;
        }
        let candidate = &self.entries[idx - 1];
        if candidate.size > 0 && addr >= candidate.addr + candidate.size {
            return None;
        }
        Some(candidate)
    }
}

/// Loads every `STT_FUNC` symbol with a non-zero address from an ELF file's
/// symbol table. Returns `None` (rather than an error) on any failure —
/// missing file, non-ELF, stripped binary — matching the original's
/// "load returns empty/NULL, the caller just reports nothing resolved"
/// contract (spec §7, §9 "symbol-load failure").
pub fn load_elf_symbols(path: &Path) -> Option<SymbolTable> {
    let file = File::open(path)
        .inspect_err(|e| log::warn!("could not open {}: {e}", path.display()))
        .ok()?;
    let mmap = unsafe { memmap2::Mmap::map(&file) }
        .inspect_err(|e| log::warn!("could not map {}: {e}", path.display()))
        .ok()?;
    let object = object::File::parse(&mmap[..])
        .inspect_err(|e| log::warn!("{} is not a recognizable object file: {e}", path.display()))
        .ok()?;

    let mut entries = Vec::new();
    for symbol in object.symbols() {
        if symbol.kind() != SymbolKind::Text || symbol.address() == 0 {
            continue;
        }
        let Ok(name) = symbol.name() else { continue };
        entries.push(Symbol {
            addr: symbol.address() as usize,
            size: symbol.size() as usize,
            name: name.to_string(),
        });
    }

    if entries.is_empty() {
        log::warn!("no function symbols found in {} (stripped?)", path.display());
        return None;
    }
    log::info!("loaded {} function symbols from {}", entries.len(), path.display());
    Some(SymbolTable::from_unsorted(entries))
}

/// Loads a `System.map`-style text listing: `<hex addr> <type> <name>` per
/// line, keeping only `T`/`t` (text/function) entries. Sizes are unknown
/// (`0`), so resolution falls back to pure nearest-below (spec §4.7).
pub fn load_sysmap_symbols(path: &Path) -> Option<SymbolTable> {
    let contents = std::fs::read_to_string(path)
        .inspect_err(|e| log::warn!("could not read {}: {e}", path.display()))
        .ok()?;

    let mut entries = Vec::new();
    for line in contents.lines() {
        let mut fields = line.split_whitespace();
        let (Some(addr_str), Some(kind), Some(name)) = (fields.next(), fields.next(), fields.next()) else {
            continue;
        };
        if !matches!(kind, "T" | "t") {
            continue;
        }
        let Ok(addr) = usize::from_str_radix(addr_str, 16) else {
            continue;
        };
        if addr == 0 {
            continue;
        }
        entries.push(Symbol {
            addr,
            size: 0,
            name: name.to_string(),
        });
    }

    if entries.is_empty() {
        log::warn!("no text symbols parsed from {}", path.display());
        return None;
    }
    log::info!("loaded {} symbols from System.map {}", entries.len(), path.display());
    Some(SymbolTable::from_unsorted(entries))
}

/// Picks the loader named by the CLI surface (spec §6: `--resolve-symbols`
/// vs. `--resolve-symbols` combined with `--sysmap`).
pub fn load_symbol_table(path: &Path, use_sysmap: bool) -> Option<SymbolTable> {
    if use_sysmap {
        load_sysmap_symbols(path)
    } else {
        load_elf_symbols(path)
    }
}

/// One row of the cross-report comparing a function's captured registration
/// address against the address resolved for its name in `table` (spec §4.7).
pub struct CrossReportRow {
    pub name: String,
    pub captured_addr: Option<usize>,
    pub resolved: Option<Symbol>,
}

impl CrossReportRow {
    pub fn status(&self) -> &'static str {
        match (&self.captured_addr, &self.resolved) {
            (Some(_), Some(sym)) if sym.name == self.name => "OK",
            (Some(_), Some(_)) => "MISMATCH",
            (Some(_), None) => "not found",
            (None, _) => "-",
        }
    }
}

/// Builds the cross-report rows for a set of `(name, captured_addr)` pairs
/// against a loaded table, resolving each captured address if present.
pub fn cross_report(functions: &[(String, Option<usize>)], table: Option<&SymbolTable>) -> Vec<CrossReportRow> {
    functions
        .iter()
        .map(|(name, captured_addr)| {
            let resolved = captured_addr
                .zip(table)
                .and_then(|(addr, table)| table.resolve(addr))
                .cloned();
            CrossReportRow {
                name: name.clone(),
                captured_addr: *captured_addr,
                resolved,
            }
        })
        .collect()
}
