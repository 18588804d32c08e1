//! End-to-end tests over a small Verilator output tree.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use vri::{run, scan, FileOutcome, InstrumentConfig, VriError};

const TOP_HEADER: &str = "\
#ifndef VERILATED_VTOP_H_
#define VERILATED_VTOP_H_

#include \"verilated.h\"

class Vtop VL_NOT_FINAL : public VerilatedModel {
  public:
    VL_IN8(&clk,0,0);
    VL_OUT8(&out,0,0);
};
#endif
";

const ROOT_HEADER: &str = "\
#ifndef VERILATED_VTOP___024ROOT_H_
#define VERILATED_VTOP___024ROOT_H_

#include \"verilated.h\"

class Vtop__Syms;

class alignas(VL_CACHE_LINE_BYTES) Vtop___024root final : public VerilatedModule {
  public:
    // DESIGN SPECIFIC STATE
    VL_IN8(clk,0,0);
    VL_OUT8(out,0,0);
    CData/*0:0*/ rst;
    CData/*0:0*/ __Vtrigprevexpr___TOP__clk__0;
    IData/*31:0*/ count;
    VlUnpacked<CData/*7:0*/, 4> regs;
    VlTriggerVec<1> __VactTriggered;
};
#endif
";

const NBA_SOURCE: &str = "\
// Verilated -*- C++ -*-
// DESCRIPTION: Verilator output: Design implementation internals
#include \"Vtop__pch.h\"
#include \"Vtop___024root.h\"

void Vtop___024root___eval_act(Vtop___024root* vlSelf);

VL_INLINE_OPT void Vtop___024root___nba_sequent__TOP__0(Vtop___024root* vlSelf) {
    (void)vlSelf;  // Prevent unused variable warning
    Vtop__Syms* const __restrict vlSymsp VL_ATTR_UNUSED = vlSelf->vlSymsp;
    // Body
    if (vlSelf->rst) {
        vlSelf->count = 0U;
    } else {
        vlSelf->count = ((IData)(1U) + vlSelf->count);
    }
    vlSelf->regs[(3U & vlSelf->count)] = (0xffU & vlSelf->count);
    vlSelf->out = ((vlSelf->rst || (0U == vlSelf->count)) ? 1U : 0U);
}

void Vtop___024root___eval_act(Vtop___024root* vlSelf) {
    // Body
    vlSelf->__VactTriggered.set(0U, ((IData)(vlSelf->clk) & (~ (IData)(vlSelf->__Vtrigprevexpr___TOP__clk__0))));
}
";

const SLOW_SOURCE: &str = "\
// Verilated -*- C++ -*-
#include \"Vtop__pch.h\"
#include \"Vtop___024root.h\"

VL_ATTR_COLD void Vtop___024root___eval_initial__TOP(Vtop___024root* vlSelf) {
    (void)vlSelf;
    // Body
    vlSelf->__Vtrigprevexpr___TOP__clk__0 = vlSelf->clk;
}

VL_ATTR_COLD void Vtop___024root___stl_sequent__TOP__0(Vtop___024root* vlSelf) {
    // Body
    vlSelf->out = ((0U == vlSelf->count) ? 1U : 0U);
}
";

const SYMS_SOURCE: &str = "\
// Verilated -*- C++ -*-
#include \"Vtop__pch.h\"

Vtop__Syms::Vtop__Syms(VerilatedContext* contextp, const char* namep, Vtop* modelp)
    : VerilatedSyms{contextp} {
    TOP.__Vconfigure(true);
}
";

const CLASSES: &str = "\
# Verilated -*- Makefile -*-
VM_CLASSES_FAST += \\
\tVtop \\
\tVtop___024root__DepSet_h84412442__0 \\

VM_CLASSES_SLOW += \\
\tVtop___024root__Slow \\
";

const NBA_FILE: &str = "Vtop___024root__DepSet_h84412442__0.cpp";
const SLOW_FILE: &str = "Vtop___024root__Slow.cpp";
const SYMS_FILE: &str = "Vtop__Syms.cpp";

fn fixture() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::write(root.join("Vtop.h"), TOP_HEADER).unwrap();
    fs::write(root.join("Vtop___024root.h"), ROOT_HEADER).unwrap();
    fs::write(root.join(NBA_FILE), NBA_SOURCE).unwrap();
    fs::write(root.join(SLOW_FILE), SLOW_SOURCE).unwrap();
    fs::write(root.join(SYMS_FILE), SYMS_SOURCE).unwrap();
    fs::write(root.join("Vtop_classes.mk"), CLASSES).unwrap();
    dir
}

fn snapshot(root: &Path) -> BTreeMap<String, String> {
    fs::read_dir(root)
        .unwrap()
        .map(|entry| {
            let path = entry.unwrap().path();
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            (name, fs::read_to_string(&path).unwrap())
        })
        .collect()
}

fn config() -> InstrumentConfig {
    InstrumentConfig::new().with_seed(5)
}

#[test]
fn test_scan_reports_watched_fields() {
    let dir = fixture();
    let fields = scan(dir.path(), &config()).unwrap();
    assert_eq!(fields.modules().collect::<Vec<_>>(), vec!["Vtop", "Vtop___024root"]);
    assert_eq!(fields.fields("Vtop___024root"), ["rst", "count", "regs"]);
    assert!(fields.fields("Vtop").is_empty());
}

#[test]
fn test_run_instruments_tree() {
    let dir = fixture();
    let root = dir.path();
    let report = run(root, &config()).unwrap();

    assert_eq!(report.modules, 2);
    assert_eq!(report.watched_fields, 3);
    assert_eq!(report.files.len(), 3);
    assert_eq!(report.instrumented().count(), 2);
    assert_eq!(
        report.skipped().map(|f| f.path.clone()).collect::<Vec<_>>(),
        vec![root.join(SYMS_FILE)]
    );

    let nba = report.files.iter().find(|f| f.path.ends_with(NBA_FILE)).unwrap();
    assert_eq!(nba.module.as_deref(), Some("Vtop___024root"));
    match nba.outcome {
        FileOutcome::Instrumented { bodies, stats } => {
            assert_eq!(bodies, 2);
            // if/else: 2, `||`: 1, ternary arms: 2
            assert_eq!(stats.coverage_points, 5);
            // count twice, regs once
            assert_eq!(stats.toggle_counters, 3);
        }
        FileOutcome::Skipped => panic!("nba file skipped"),
    }

    let text = fs::read_to_string(root.join(NBA_FILE)).unwrap();
    assert_eq!(text.matches("#include \"coverage.hpp\"\n").count(), 1);
    assert_eq!(text.matches("#include \"counting.hpp\"\n").count(), 1);
    assert!(text.contains(
        "#include \"coverage.hpp\"\n#include \"counting.hpp\"\n#include \"Vtop__pch.h\"\n"
    ));
    assert!(text.contains(
        "        vlSelf->count = __vri_bfcntr.Assign(vlSelf->count, 0U);\n"
    ));
    assert!(text.contains(
        "    vlSelf->regs[3U & vlSelf->count] = __vri_bfcntr.Assign(vlSelf->regs[3U & vlSelf->count], 0xffU & vlSelf->count);\n"
    ));
    assert!(text.contains("    vlSelf->out = (vlSelf->rst || (__vri_covmap.AddPoint(0x"));
    assert!(!text.contains("__vri_bfcntr.Assign(vlSelf->out"));
    assert!(text.contains("    } else {\n        __vri_covmap.AddPoint(0x"));

    assert_eq!(fs::read_to_string(root.join(SYMS_FILE)).unwrap(), SYMS_SOURCE);

    for name in ["coverage.hpp", "coverage.cpp", "counting.hpp", "counting.cpp"] {
        assert!(root.join(name).is_file(), "{name} not written");
    }
    assert_eq!(report.runtime_files.len(), 4);

    let classes = fs::read_to_string(root.join("Vtop_classes.mk")).unwrap();
    assert!(classes.starts_with(
        "# Verilated -*- Makefile -*-\nVM_CLASSES_FAST += \\\n\tcoverage \\\n\tcounting \\\n\tVtop \\\n"
    ));
}

#[test]
fn test_bytes_outside_bodies_unchanged() {
    let dir = fixture();
    let root = dir.path();
    run(root, &config()).unwrap();

    let text = fs::read_to_string(root.join(SLOW_FILE)).unwrap();
    let without_includes = text.replacen(
        "#include \"coverage.hpp\"\n#include \"counting.hpp\"\n",
        "",
        1,
    );
    let body = "    vlSelf->out = ((0U == vlSelf->count) ? 1U : 0U);\n";
    let (before, after) = SLOW_SOURCE.split_once(body).unwrap();
    assert!(without_includes.starts_with(before));
    assert!(without_includes.ends_with(after));

    // The initial block has no category and keeps its original body.
    assert!(text.contains("    vlSelf->__Vtrigprevexpr___TOP__clk__0 = vlSelf->clk;\n"));
}

#[test]
fn test_second_run_is_refused_before_touching_files() {
    let dir = fixture();
    let root = dir.path();
    run(root, &config()).unwrap();
    let before = snapshot(root);

    let err = run(root, &config()).unwrap_err();
    assert!(err.is_already_instrumented());
    assert_eq!(snapshot(root), before);
}

#[test]
fn test_unsupported_statement_aborts_without_writes() {
    let dir = fixture();
    let root = dir.path();
    // Sorted after the nba file, so that one is already planned when this fails.
    fs::write(
        root.join("Vtop___024root__DepSet_h9__0.cpp"),
        "#include \"Vtop__pch.h\"\n\
         void Vtop___024root___nba_comb__TOP__0(Vtop___024root* vlSelf) {\n\
         \x20   // Body\n\
         \x20   switch (vlSelf->count) {\n\
         \x20   case 0U: vlSelf->out = 1U; break;\n\
         \x20   default: break;\n\
         \x20   }\n\
         }\n",
    )
    .unwrap();
    let before = snapshot(root);

    let err = run(root, &config()).unwrap_err();
    match err {
        VriError::UnsupportedInBody {
            path,
            start,
            end,
            kind,
            fragment,
        } => {
            assert_eq!(path, root.join("Vtop___024root__DepSet_h9__0.cpp"));
            assert_eq!((start, end), (3, 7));
            assert_eq!(kind, "switch statement");
            assert!(fragment.starts_with("switch (vlSelf->count) {"));
        }
        other => panic!("unexpected error {other}"),
    }
    assert_eq!(snapshot(root), before);
}

#[test]
fn test_parse_error_aborts_without_writes() {
    let dir = fixture();
    let root = dir.path();
    fs::write(
        root.join(NBA_FILE),
        NBA_SOURCE.replace("vlSelf->count = 0U;", "vlSelf->count = 0U"),
    )
    .unwrap();
    let before = snapshot(root);

    let err = run(root, &config()).unwrap_err();
    match err {
        VriError::Parse { path, start, .. } => {
            assert!(path.ends_with(NBA_FILE));
            assert_eq!(start, 11);
        }
        other => panic!("unexpected error {other}"),
    }
    assert_eq!(snapshot(root), before);
}

#[test]
fn test_missing_classes_line() {
    let dir = fixture();
    let root = dir.path();
    fs::write(root.join("Vtop_classes.mk"), "VM_CLASSES_SLOW += \\\n").unwrap();
    let before = snapshot(root);

    let err = run(root, &config()).unwrap_err();
    assert!(matches!(err, VriError::MissingLine { .. }));
    assert_eq!(snapshot(root), before);
}

#[test]
fn test_seeded_runs_match() {
    let first = fixture();
    let second = fixture();
    run(first.path(), &config()).unwrap();
    run(second.path(), &config()).unwrap();
    assert_eq!(
        fs::read_to_string(first.path().join(NBA_FILE)).unwrap(),
        fs::read_to_string(second.path().join(NBA_FILE)).unwrap()
    );
}

#[test]
fn test_retype_then_scan() {
    let dir = fixture();
    let root = dir.path();
    let report = vri::retype(root, &config()).unwrap();
    assert_eq!(report.headers, vec![root.join("Vtop___024root.h")]);
    assert_eq!(report.fields, 2);

    let header = fs::read_to_string(root.join("Vtop___024root.h")).unwrap();
    assert!(header.contains("    CountingCData/*0:0*/ rst;\n"));
    assert!(header.contains("    CountingIData/*31:0*/ count;\n"));
    assert!(header.contains("    CData/*0:0*/ __Vtrigprevexpr___TOP__clk__0;\n"));
    assert!(header.contains(
        "#define __COUNTING_IS_THREADED 0\n#include \"counting_data.h\"\n#undef __COUNTING_IS_THREADED\n#include \"verilated.h\"\n"
    ));

    // Retyped scalars are counted by their type; only the array stays watched.
    let fields = scan(root, &config()).unwrap();
    assert_eq!(fields.fields("Vtop___024root"), ["regs"]);
}
