//! Graph dumps for decision diagrams.
//!
//! Writers for DOT, daVinci, and BLIF renderings of a set of BDD
//! roots. Only the structural accessors of [`DdManager`] are used, so
//! any engine (including test doubles) can be dumped. Node names are
//! the minimal unique prefix of the node's address.

use std::collections::HashMap;
use std::io::{self, Write};

use crate::dd::{Bdd, DdManager, DdNodeId};

struct NodeInfo {
    var: Option<u32>,
    then: Option<DdNodeId>,
    els: Option<DdNodeId>,
    els_complement: bool,
}

/// Collects every node reachable from the roots, in discovery order.
fn collect_nodes(
    mgr: &dyn DdManager,
    roots: &[&Bdd],
) -> io::Result<(Vec<DdNodeId>, HashMap<DdNodeId, NodeInfo>)> {
    let mut order = Vec::new();
    let mut info: HashMap<DdNodeId, NodeInfo> = HashMap::new();
    let mut stack: Vec<DdNodeId> = roots.iter().map(|r| r.id()).collect();

    while let Some(id) = stack.pop() {
        if info.contains_key(&id) {
            continue;
        }
        order.push(id);
        if mgr.is_constant(id) {
            info.insert(id, NodeInfo { var: None, then: None, els: None, els_complement: false });
            continue;
        }
        let then = mgr.node_then(id).map_err(io::Error::other)?;
        let els = mgr.node_else(id).map_err(io::Error::other)?;
        // the parent keeps both children alive; drop the references the
        // accessors handed out
        mgr.recursive_deref_node(then);
        mgr.recursive_deref_node(els);
        info.insert(
            id,
            NodeInfo {
                var: mgr.node_var(id),
                then: Some(then),
                els: Some(els),
                els_complement: mgr.is_complement(els),
            },
        );
        stack.push(then);
        stack.push(els);
    }
    Ok((order, info))
}

/// Shortest hex-prefix length that tells all node addresses apart.
fn name_width(nodes: &[DdNodeId]) -> usize {
    let full: Vec<String> = nodes.iter().map(|n| format!("{:016x}", n.0)).collect();
    for len in 1..=16 {
        let mut seen = std::collections::HashSet::new();
        if full.iter().all(|s| seen.insert(&s[..len])) {
            return len;
        }
    }
    16
}

fn node_name(id: DdNodeId, width: usize) -> String {
    format!("{:016x}", id.0)[..width].to_string()
}

fn var_label(input_names: &[&str], var: u32) -> String {
    input_names
        .get(var as usize)
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("x{var}"))
}

/// Writes a DOT-format graph of the given roots. Solid edges are
/// then-arcs, dashed edges regular else-arcs, dotted edges complement
/// else-arcs.
pub fn dump_dot(
    out: &mut dyn Write,
    mgr: &dyn DdManager,
    roots: &[&Bdd],
    input_names: &[&str],
    output_names: &[&str],
) -> io::Result<()> {
    let (order, info) = collect_nodes(mgr, roots)?;
    let width = name_width(&order);

    writeln!(out, "digraph \"DD\" {{")?;
    writeln!(out, "size = \"7.5,10\"")?;
    writeln!(out, "center = true;")?;

    for (i, root) in roots.iter().enumerate() {
        let label = output_names
            .get(i)
            .map(|s| s.to_string())
            .unwrap_or_else(|| format!("f{i}"));
        writeln!(out, "\"{label}\" [shape = box];")?;
        let style = if mgr.is_complement(root.id()) { "dotted" } else { "solid" };
        writeln!(
            out,
            "\"{label}\" -> \"{}\" [style = {style}];",
            node_name(root.id(), width)
        )?;
    }

    for id in &order {
        let name = node_name(*id, width);
        let ni = &info[id];
        match ni.var {
            None => {
                writeln!(out, "\"{name}\" [shape = box, label = \"1\"];")?;
            }
            Some(var) => {
                writeln!(
                    out,
                    "\"{name}\" [label = \"{}\"];",
                    var_label(input_names, var)
                )?;
                if let Some(then) = ni.then {
                    writeln!(
                        out,
                        "\"{name}\" -> \"{}\" [style = solid];",
                        node_name(then, width)
                    )?;
                }
                if let Some(els) = ni.els {
                    let style = if ni.els_complement { "dotted" } else { "dashed" };
                    writeln!(
                        out,
                        "\"{name}\" -> \"{}\" [style = {style}];",
                        node_name(els, width)
                    )?;
                }
            }
        }
    }
    writeln!(out, "}}")
}

/// Writes a daVinci term representation of the given roots.
pub fn dump_davinci(
    out: &mut dyn Write,
    mgr: &dyn DdManager,
    roots: &[&Bdd],
    input_names: &[&str],
    output_names: &[&str],
) -> io::Result<()> {
    let (order, info) = collect_nodes(mgr, roots)?;
    let width = name_width(&order);

    writeln!(out, "[")?;
    for (i, root) in roots.iter().enumerate() {
        if i > 0 {
            writeln!(out, ",")?;
        }
        let label = output_names
            .get(i)
            .map(|s| s.to_string())
            .unwrap_or_else(|| format!("f{i}"));
        write!(
            out,
            "l(\"{label}\",n(\"root\",[a(\"OBJECT\",\"{label}\")],[e(\"edge\",[],r(\"{}\"))]))",
            node_name(root.id(), width)
        )?;
    }
    for id in &order {
        writeln!(out, ",")?;
        let name = node_name(*id, width);
        let ni = &info[id];
        match ni.var {
            None => {
                write!(
                    out,
                    "l(\"{name}\",n(\"constant\",[a(\"OBJECT\",\"1\")],[]))"
                )?;
            }
            Some(var) => {
                let (then, els) = (ni.then.unwrap_or(*id), ni.els.unwrap_or(*id));
                let els_attr = if ni.els_complement { "dotted" } else { "dashed" };
                write!(
                    out,
                    "l(\"{name}\",n(\"node\",[a(\"OBJECT\",\"{}\")],[\
                     e(\"then\",[a(\"EDGEPATTERN\",\"solid\")],r(\"{}\")),\
                     e(\"else\",[a(\"EDGEPATTERN\",\"{els_attr}\")],r(\"{}\"))]))",
                    var_label(input_names, var),
                    node_name(then, width),
                    node_name(els, width)
                )?;
            }
        }
    }
    writeln!(out, "\n]")
}

/// Writes the BLIF body (the `.names` tables) for the given roots.
/// Each internal node becomes a 2:1 multiplexer table on its decision
/// variable; a complemented else-arc goes through an inverter table.
pub fn dump_blif_body(
    out: &mut dyn Write,
    mgr: &dyn DdManager,
    roots: &[&Bdd],
    input_names: &[&str],
    output_names: &[&str],
) -> io::Result<()> {
    let (order, info) = collect_nodes(mgr, roots)?;
    let width = name_width(&order);

    for (i, root) in roots.iter().enumerate() {
        let label = output_names
            .get(i)
            .map(|s| s.to_string())
            .unwrap_or_else(|| format!("f{i}"));
        writeln!(out, ".names {} {label}", node_name(root.id(), width))?;
        if mgr.is_complement(root.id()) {
            writeln!(out, "0 1")?;
        } else {
            writeln!(out, "1 1")?;
        }
    }

    for id in &order {
        let name = node_name(*id, width);
        let ni = &info[id];
        match ni.var {
            None => {
                writeln!(out, ".names {name}")?;
                writeln!(out, "1")?;
            }
            Some(var) => {
                let then = node_name(ni.then.unwrap_or(*id), width);
                let mut els = node_name(ni.els.unwrap_or(*id), width);
                if ni.els_complement {
                    let inv = format!("{els}.inv");
                    writeln!(out, ".names {els} {inv}")?;
                    writeln!(out, "0 1")?;
                    els = inv;
                }
                writeln!(
                    out,
                    ".names {} {then} {els} {name}",
                    var_label(input_names, var)
                )?;
                writeln!(out, "11- 1")?;
                writeln!(out, "0-1 1")?;
            }
        }
    }
    Ok(())
}

/// Writes a complete BLIF model (header, body, trailer) for the given
/// roots.
pub fn dump_blif(
    out: &mut dyn Write,
    mgr: &dyn DdManager,
    roots: &[&Bdd],
    input_names: &[&str],
    output_names: &[&str],
    model_name: &str,
) -> io::Result<()> {
    writeln!(out, ".model {model_name}")?;
    writeln!(out, ".inputs {}", input_names.join(" "))?;
    let outputs: Vec<String> = (0..roots.len())
        .map(|i| {
            output_names
                .get(i)
                .map(|s| s.to_string())
                .unwrap_or_else(|| format!("f{i}"))
        })
        .collect();
    writeln!(out, ".outputs {}", outputs.join(" "))?;
    dump_blif_body(out, mgr, roots, input_names, output_names)?;
    writeln!(out, ".end")
}
