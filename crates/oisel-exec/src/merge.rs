//! OIFITS merger: concatenate the selected data of several files of one target.
//!
//! Inputs are processed in order against one merge context. Metadata tables
//! (OI_WAVELENGTH, OI_ARRAY, OI_CORR) are copied only when retained data
//! references them, under a name unique in the result; data tables are then
//! re-pointed to the new names. Name maps are per input file, the result and
//! its target persist across inputs.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use oisel_core::hash::hash_serde;
use oisel_core::id::TableId;
use oisel_core::manifest::{MergeManifest, MergedTable, Rename, SkippedTable};
use oisel_core::model::{OiFile, OiTable, TargetManager};
use oisel_core::schema::{columns, keywords, OiStandard, TableKind};
use oisel_core::types::ColumnData;
use oisel_select::{Selector, SelectorMatcher};

use crate::metrics::{emit_span, now_ms};
use crate::runtime::ExecError;

/// Path given to merged files.
pub const MERGED_PATH: &str = "merged.fits";

#[derive(Debug, Clone)]
pub struct Merged {
    pub file: OiFile,
    pub manifest: MergeManifest,
}

#[derive(Debug, Default)]
struct NameMap {
    used: BTreeSet<String>,
    renamed: BTreeMap<String, String>,
}

impl NameMap {
    fn clear(&mut self) {
        self.used.clear();
        self.renamed.clear();
    }
}

struct Context {
    result: OiFile,
    manifest: MergeManifest,
    /// Trimmed name of the single target of the result.
    target_name: Option<String>,
    target_id: i16,
    ins: NameMap,
    arr: NameMap,
    corr: NameMap,
}

impl Context {
    fn map(&mut self, kind: TableKind) -> Option<&mut NameMap> {
        match kind {
            TableKind::Wavelength => Some(&mut self.ins),
            TableKind::Array => Some(&mut self.arr),
            TableKind::Corr => Some(&mut self.corr),
            _ => None,
        }
    }

    fn skip(&mut self, source: &str, table: &OiTable, reason: String) {
        tracing::warn!(file = source, ext = table.ext_nb(), kind = %table.kind(), %reason, "data table skipped");
        self.manifest.skipped.push(SkippedTable {
            source: source.to_string(),
            kind: table.kind(),
            ext_nb: table.ext_nb(),
            reason,
        });
    }
}

pub struct Merger;

impl Merger {
    /// Merge `inputs` into one file of standard `standard` (default: highest
    /// standard among inputs). Tables failing `selector` are left out.
    pub fn process(
        selector: Option<&Selector>,
        standard: Option<OiStandard>,
        inputs: &[&OiFile],
    ) -> Result<Merged, ExecError> {
        let started = now_ms();
        if inputs.is_empty() {
            return Err(ExecError::NoInput);
        }
        let standard = standard
            .or_else(|| inputs.iter().map(|f| f.standard()).max())
            .unwrap_or(OiStandard::V2);

        let mut targets = TargetManager::new();
        for input in inputs {
            for name in target_names(input) {
                targets.register(&name);
            }
        }
        let matcher = selector.map(|s| SelectorMatcher::new(s, &targets));

        let mut ctx = Context {
            result: OiFile::new(MERGED_PATH, standard),
            manifest: MergeManifest::new(standard, started),
            target_name: None,
            target_id: 0,
            ins: NameMap::default(),
            arr: NameMap::default(),
            corr: NameMap::default(),
        };

        for input in inputs {
            ctx.manifest.inputs.push(input.path().to_string());
            ctx.ins.clear();
            ctx.arr.clear();
            ctx.corr.clear();

            let retained = retain_data(&mut ctx, input, matcher.as_ref());
            merge_target(&mut ctx, input)?;
            for kind in [TableKind::Wavelength, TableKind::Array, TableKind::Corr] {
                merge_metadata(&mut ctx, input, kind);
            }
            for id in retained {
                merge_data(&mut ctx, input, id)?;
            }
        }

        let layout: Vec<(String, Option<String>, usize)> = ctx
            .result
            .tables()
            .map(|(_, t)| {
                (
                    t.kind().extname().to_string(),
                    t.defined_name().map(str::to_string),
                    t.nb_rows(),
                )
            })
            .collect();
        let digest = hash_serde(&layout)?;
        let manifest = ctx.manifest.finish(now_ms(), Some(digest));

        tracing::debug!(
            inputs = inputs.len(),
            merged = manifest.nb_merged_data(),
            skipped = manifest.skipped.len(),
            renames = manifest.renames.len(),
            "merge done"
        );
        emit_span(
            "merge",
            &[
                ("inputs", inputs.len().to_string()),
                ("merged", manifest.nb_merged_data().to_string()),
                ("skipped", manifest.skipped.len().to_string()),
            ],
        );
        Ok(Merged {
            file: ctx.result,
            manifest,
        })
    }
}

fn target_names(file: &OiFile) -> Vec<String> {
    match file.target().and_then(|t| t.column(columns::TARGET)) {
        Some(ColumnData::Str(names)) => names.iter().cloned().collect(),
        _ => Vec::new(),
    }
}

/// Data tables of `input` kept for the result; records the names they use.
fn retain_data(
    ctx: &mut Context,
    input: &OiFile,
    matcher: Option<&SelectorMatcher<'_>>,
) -> Vec<TableId> {
    let v2 = ctx.result.standard() >= OiStandard::V2;
    let mut retained = Vec::new();
    for (id, table) in input.data_tables() {
        if table.kind().min_standard() > ctx.result.standard() {
            ctx.skip(
                input.path(),
                table,
                format!("{} requires {}", table.kind(), table.kind().min_standard()),
            );
            continue;
        }
        if let Some(m) = matcher {
            let Some(view) = input.view(id) else {
                continue;
            };
            if !m.matches(&view) {
                tracing::trace!(file = input.path(), ext = table.ext_nb(), "not selected");
                continue;
            }
        }
        if let Some(n) = table.ins_name() {
            ctx.ins.used.insert(n.trim().to_string());
        }
        if let Some(n) = table.arr_name() {
            ctx.arr.used.insert(n.trim().to_string());
        }
        if v2 {
            if let Some(n) = table.corr_name() {
                ctx.corr.used.insert(n.trim().to_string());
            }
        }
        retained.push(id);
    }
    retained
}

fn merge_target(ctx: &mut Context, input: &OiFile) -> Result<(), ExecError> {
    let file = input.path().to_string();
    let names = target_names(input);
    if names.len() != 1 {
        return Err(ExecError::TargetCount {
            file,
            count: names.len(),
        });
    }
    let name = names[0].trim().to_string();
    if name.is_empty() {
        return Err(ExecError::EmptyTargetName { file });
    }

    match &ctx.target_name {
        Some(expected) if *expected != name => Err(ExecError::TargetMismatch {
            expected: expected.clone(),
            found: name,
            file,
        }),
        Some(_) => Ok(()),
        None => {
            let Some(target) = input.target() else {
                return Err(ExecError::TargetCount { file, count: 0 });
            };
            ctx.target_id = match target.column(columns::TARGET_ID) {
                Some(ColumnData::I16(ids)) => ids.first().copied().unwrap_or(1),
                _ => 1,
            };
            let ext_nb = target.ext_nb();
            let id = ctx.result.copy_table(target);
            record_merged(ctx, &file, TableKind::Target, ext_nb, id);
            ctx.target_name = Some(name);
            Ok(())
        }
    }
}

fn merge_metadata(ctx: &mut Context, input: &OiFile, kind: TableKind) {
    if kind.min_standard() > ctx.result.standard() {
        return;
    }
    let Some(keyword) = kind.name_keyword() else {
        return;
    };
    for (_, table) in input.tables_of(kind) {
        let Some(name) = table.defined_name().map(|n| n.trim().to_string()) else {
            continue;
        };
        let referenced = ctx.map(kind).is_some_and(|m| m.used.contains(&name));
        // a name defined twice in one input maps to its first table
        let seen = ctx.map(kind).is_some_and(|m| m.renamed.contains_key(&name));
        if !referenced || seen {
            continue;
        }

        let new_name = ctx.result.unique_name(kind, &name);
        let mut copy = table.clone();
        copy.set_keyword(keyword, new_name.as_str());
        let id = ctx.result.add_table(copy);
        record_merged(ctx, input.path(), kind, table.ext_nb(), id);
        if new_name != name {
            tracing::debug!(file = input.path(), %kind, from = %name, to = %new_name, "renamed");
            ctx.manifest.renames.push(Rename {
                source: input.path().to_string(),
                kind,
                from: name.clone(),
                to: new_name.clone(),
            });
        }
        if let Some(m) = ctx.map(kind) {
            m.renamed.insert(name, new_name);
        }
    }
}

fn merge_data(ctx: &mut Context, input: &OiFile, id: TableId) -> Result<(), ExecError> {
    let Some(table) = input.table(id) else {
        return Ok(());
    };
    let v2 = ctx.result.standard() >= OiStandard::V2;

    let Some(ins) = table.ins_name().map(|n| n.trim().to_string()) else {
        ctx.skip(input.path(), table, "no INSNAME".to_string());
        return Ok(());
    };
    let Some(new_ins) = ctx.ins.renamed.get(&ins).cloned() else {
        ctx.skip(input.path(), table, format!("missing OI_WAVELENGTH '{ins}'"));
        return Ok(());
    };
    let new_arr = match table.arr_name().map(|n| n.trim().to_string()) {
        None => None,
        Some(arr) => match ctx.arr.renamed.get(&arr) {
            Some(n) => Some(n.clone()),
            None => {
                ctx.skip(input.path(), table, format!("missing OI_ARRAY '{arr}'"));
                return Ok(());
            }
        },
    };
    let new_corr = match table.corr_name().map(|n| n.trim().to_string()) {
        Some(corr) if v2 => match ctx.corr.renamed.get(&corr) {
            Some(n) => Some(n.clone()),
            None => {
                ctx.skip(input.path(), table, format!("missing OI_CORR '{corr}'"));
                return Ok(());
            }
        },
        _ => None,
    };

    let mut copy = table.clone();
    copy.set_keyword(keywords::INSNAME, new_ins.as_str());
    if let Some(arr) = new_arr {
        copy.set_keyword(keywords::ARRNAME, arr.as_str());
    }
    match new_corr {
        Some(corr) => copy.set_keyword(keywords::CORRNAME, corr.as_str()),
        None => {
            copy.remove_keyword(keywords::CORRNAME);
        }
    }
    let ids = vec![ctx.target_id; copy.nb_rows()];
    copy.set_column(columns::TARGET_ID, ColumnData::I16(Arc::from(ids)))?;

    let new_id = ctx.result.add_table(copy);
    record_merged(ctx, input.path(), table.kind(), table.ext_nb(), new_id);
    Ok(())
}

fn record_merged(ctx: &mut Context, source: &str, kind: TableKind, source_ext_nb: usize, id: TableId) {
    let ext_nb = ctx.result.table(id).map(|t| t.ext_nb()).unwrap_or_default();
    ctx.manifest.merged.push(MergedTable {
        source: source.to_string(),
        kind,
        source_ext_nb,
        ext_nb,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use oisel_core::model::{DataRow, DataTableBuilder};
    use oisel_core::range::Range;

    /// One target, one OI_ARRAY, one OI_WAVELENGTH named `ins`, `n` OI_VIS2.
    fn input(path: &str, target: &str, ins: &str, n: usize) -> OiFile {
        let mut f = OiFile::new(path, OiStandard::V2);
        f.add_table(OiTable::target(&[(3, target)]).unwrap());
        f.add_table(OiTable::array("VLTI", &[(1, "A0"), (2, "K0")]).unwrap());
        f.add_table(OiTable::wavelength(ins, &[1.6e-6, 1.7e-6]).unwrap());
        for i in 0..n {
            f.add_table(
                DataTableBuilder::new(TableKind::Vis2, ins, 2)
                    .arr_name("VLTI")
                    .row(DataRow::new(3, 58000.7 + i as f64, &[1, 2], &[0.5, 0.6]))
                    .build()
                    .unwrap(),
            );
        }
        f
    }

    fn data_ins_names(f: &OiFile) -> Vec<String> {
        f.data_tables()
            .filter_map(|(_, t)| t.ins_name().map(str::to_string))
            .collect()
    }

    #[test]
    fn test_no_input() {
        let err = Merger::process(None, None, &[]).unwrap_err();
        assert!(matches!(err, ExecError::NoInput));
        assert!(err.to_string().contains("no input"));
        let err = Merger::process(None, Some(OiStandard::V2), &[]).unwrap_err();
        assert!(matches!(err, ExecError::NoInput));
    }

    #[test]
    fn test_target_mismatch() {
        let a = input("a.fits", "A", "SPECTRO", 1);
        let b = input("b.fits", "B", "SPECTRO", 1);
        let err = Merger::process(None, None, &[&a, &b]).unwrap_err();
        assert!(matches!(err, ExecError::TargetMismatch { .. }));
        assert!(err.to_string().contains("mismatch"));
    }

    #[test]
    fn test_target_rules() {
        let mut two = input("two.fits", "A", "SPECTRO", 1);
        let (id, _) = two.tables_of(TableKind::Target).next().unwrap();
        *two.table_mut(id).unwrap() = OiTable::target(&[(1, "A"), (2, "B")]).unwrap();
        assert!(matches!(
            Merger::process(None, None, &[&two]),
            Err(ExecError::TargetCount { count: 2, .. })
        ));

        let blank = input("blank.fits", "  ", "SPECTRO", 1);
        assert!(matches!(
            Merger::process(None, None, &[&blank]),
            Err(ExecError::EmptyTargetName { .. })
        ));
    }

    #[test]
    fn test_concatenates_data_tables() {
        let a = input("a.fits", "A", "SPECTRO", 2);
        let b = input("b.fits", "A ", "SPECTRO", 3);
        let merged = Merger::process(Some(&Selector::new()), None, &[&a, &b]).unwrap();
        let f = &merged.file;
        assert_eq!(f.target().map(|t| t.nb_rows()), Some(1));
        assert_eq!(f.data_tables().count(), 5);
        assert_eq!(merged.manifest.nb_merged_data(), 5);
        assert_eq!(merged.manifest.inputs, vec!["a.fits", "b.fits"]);
        assert!(merged.manifest.outputs_digest.is_some());
        for (_, t) in f.data_tables() {
            match t.column(columns::TARGET_ID) {
                Some(ColumnData::I16(ids)) => assert!(ids.iter().all(|id| *id == 3)),
                other => panic!("unexpected TARGET_ID column {other:?}"),
            }
        }
    }

    #[test]
    fn test_colliding_names_are_renamed() {
        let a = input("a.fits", "A", "SPECTRO", 1);
        let b = input("b.fits", "A", "SPECTRO", 1);
        let merged = Merger::process(None, None, &[&a, &b]).unwrap();
        let f = &merged.file;
        assert!(f.has_name(TableKind::Wavelength, "SPECTRO"));
        assert!(f.has_name(TableKind::Wavelength, "SPECTRO_1"));
        assert!(f.has_name(TableKind::Array, "VLTI_1"));
        assert_eq!(data_ins_names(f), vec!["SPECTRO", "SPECTRO_1"]);
        assert_eq!(merged.manifest.renames.len(), 2);
    }

    #[test]
    fn test_unreferenced_metadata_dropped() {
        let mut a = input("a.fits", "A", "SPECTRO", 1);
        a.add_table(OiTable::wavelength("UNUSED", &[2.0e-6]).unwrap());
        let merged = Merger::process(None, None, &[&a]).unwrap();
        assert!(!merged.file.has_name(TableKind::Wavelength, "UNUSED"));
    }

    #[test]
    fn test_selector_filters_tables() {
        let a = input("a.fits", "A", "SPECTRO", 3);
        let s = Selector::new().with_mjd_ranges(vec![Range::new(58001.0, 58001.9)]);
        let merged = Merger::process(Some(&s), None, &[&a]).unwrap();
        assert_eq!(merged.file.data_tables().count(), 1);
    }

    #[test]
    fn test_missing_array_is_soft_failure() {
        let mut a = input("a.fits", "A", "SPECTRO", 1);
        a.add_table(
            DataTableBuilder::new(TableKind::Vis2, "SPECTRO", 2)
                .arr_name("CHARA")
                .row(DataRow::new(3, 58000.7, &[1, 2], &[0.5, 0.6]))
                .build()
                .unwrap(),
        );
        let merged = Merger::process(None, None, &[&a]).unwrap();
        assert_eq!(merged.file.data_tables().count(), 1);
        assert_eq!(merged.manifest.skipped.len(), 1);
        assert!(merged.manifest.skipped[0].reason.contains("CHARA"));
    }

    #[test]
    fn test_v1_output_skips_flux() {
        let mut a = input("a.fits", "A", "SPECTRO", 1);
        a.add_table(
            DataTableBuilder::new(TableKind::Flux, "SPECTRO", 2)
                .row(DataRow::new(3, 58000.7, &[1], &[1.0, 1.0]))
                .build()
                .unwrap(),
        );
        let merged = Merger::process(None, Some(OiStandard::V1), &[&a]).unwrap();
        assert_eq!(merged.file.standard(), OiStandard::V1);
        assert_eq!(merged.file.tables_of(TableKind::Flux).count(), 0);
        assert_eq!(merged.manifest.skipped.len(), 1);

        let merged = Merger::process(None, None, &[&a]).unwrap();
        assert_eq!(merged.file.tables_of(TableKind::Flux).count(), 1);
    }
}
