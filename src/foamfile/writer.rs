use std::fmt::Write as _;

use crate::types::foam_value::{FoamDict, FoamValue};

const BANNER: &str = r"/*--------------------------------*- C++ -*----------------------------------*\
| =========                 |                                                 |
| \\      /  F ield         | OpenFOAM: The Open Source CFD Toolbox           |
|  \\    /   O peration     | Version:  4.x                                   |
|   \\  /    A nd           | Web:      www.OpenFOAM.org                      |
|    \\/     M anipulation  |                                                 |
\*---------------------------------------------------------------------------*/";

const SEPARATOR: &str =
    "// * * * * * * * * * * * * * * * * * * * * * * * * * * * * * * * * * * * * * //";

const FOOTER: &str =
    "// ************************************************************************* //";

// Column where values start; longer keys still get one space.
const KEY_WIDTH: usize = 16;

pub(crate) struct HeaderFields<'a> {
    pub class: &'a str,
    pub location: &'a str,
    pub object: &'a str,
}

/// Renders a whole dictionary file: banner, header block, entries and footer.
pub(crate) fn write_foam_file(header: &HeaderFields<'_>, values: &FoamDict) -> String {
    let mut out = String::new();
    out.push_str(BANNER);
    out.push('\n');
    out.push_str("FoamFile\n{\n");
    write_entry(&mut out, 1, "version", &FoamValue::token("2.0"));
    write_entry(&mut out, 1, "format", &FoamValue::token("ascii"));
    write_entry(&mut out, 1, "class", &FoamValue::token(header.class));
    if !header.location.is_empty() {
        write_entry(
            &mut out,
            1,
            "location",
            &FoamValue::token(format!("\"{}\"", header.location)),
        );
    }
    write_entry(&mut out, 1, "object", &FoamValue::token(header.object));
    out.push_str("}\n");
    out.push_str(SEPARATOR);
    out.push_str("\n\n");

    for (key, value) in values {
        if matches!(value, FoamValue::Unset) || (key.starts_with('#') && value.is_empty()) {
            continue;
        }
        write_entry(&mut out, 0, key, value);
        out.push('\n');
    }

    out.push_str(FOOTER);
    out.push('\n');
    out
}

fn indent(out: &mut String, level: usize) {
    for _ in 0..level {
        out.push_str("    ");
    }
}

fn write_entry(out: &mut String, level: usize, key: &str, value: &FoamValue) {
    match value {
        FoamValue::Unset => {}
        FoamValue::Dict(dict) => {
            indent(out, level);
            out.push_str(key);
            out.push('\n');
            indent(out, level);
            out.push_str("{\n");
            for (sub_key, sub_value) in dict {
                write_entry(out, level + 1, sub_key, sub_value);
            }
            indent(out, level);
            out.push_str("}\n");
        }
        FoamValue::List(items) if items.iter().any(|i| matches!(i, FoamValue::Dict(_) | FoamValue::List(_))) => {
            indent(out, level);
            out.push_str(key);
            out.push('\n');
            indent(out, level);
            out.push_str("(\n");
            for item in items {
                write_list_item(out, level + 1, item);
            }
            indent(out, level);
            out.push_str(");\n");
        }
        _ if key.starts_with('#') => {
            indent(out, level);
            let _ = writeln!(out, "{:<width$} \"{}\"", key, value.inline_text(), width = KEY_WIDTH - 1);
        }
        _ => {
            indent(out, level);
            let _ = writeln!(out, "{:<width$} {};", key, value.inline_text(), width = KEY_WIDTH - 1);
        }
    }
}

fn write_list_item(out: &mut String, level: usize, item: &FoamValue) {
    match item {
        FoamValue::Dict(dict) => {
            indent(out, level);
            out.push_str("{\n");
            for (key, value) in dict {
                write_entry(out, level + 1, key, value);
            }
            indent(out, level);
            out.push_str("}\n");
        }
        other => {
            indent(out, level);
            out.push_str(&other.inline_text());
            out.push('\n');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::foam_value::dict;

    #[test]
    fn entries_are_padded_and_terminated() {
        let mut out = String::new();
        write_entry(&mut out, 0, "internalField", &FoamValue::token("uniform 0.1"));
        assert_eq!(out, "internalField   uniform 0.1;\n");
    }

    #[test]
    fn long_keys_keep_a_separator() {
        let mut out = String::new();
        write_entry(&mut out, 1, "nNonOrthogonalCorrectors", &FoamValue::token("0"));
        write_entry(&mut out, 1, "div(phi,epsilon)", &FoamValue::token("bounded Gauss upwind"));
        assert_eq!(
            out,
            "    nNonOrthogonalCorrectors 0;\n    div(phi,epsilon) bounded Gauss upwind;\n"
        );
    }

    #[test]
    fn include_renders_as_directive() {
        let mut out = String::new();
        write_entry(&mut out, 0, "#include", &FoamValue::token("initialConditions"));
        assert_eq!(out, "#include        \"initialConditions\"\n");
    }

    #[test]
    fn nested_blocks_indent() {
        let values = dict([(
            "boundaryField",
            FoamValue::Dict(dict([(
                "inlet",
                FoamValue::Dict(dict([("type", FoamValue::token("zeroGradient"))])),
            )])),
        )]);
        let text = write_foam_file(
            &HeaderFields { class: "volScalarField", location: "0", object: "p" },
            &values,
        );
        assert!(text.contains("boundaryField\n{\n    inlet\n    {\n        type            zeroGradient;\n    }\n}\n"));
        assert!(text.contains("    location        \"0\";\n"));
    }

    #[test]
    fn unset_include_is_omitted() {
        let values = dict([
            ("#include", FoamValue::Unset),
            ("internalField", FoamValue::token("uniform 0")),
        ]);
        let text = write_foam_file(
            &HeaderFields { class: "volScalarField", location: "0", object: "p" },
            &values,
        );
        assert!(!text.contains("#include"));
        assert!(text.contains("internalField   uniform 0;"));
    }
}
