//! Wrapper introspection orchestrator (spec §4.6): runs phases A–D over
//! every route handler and produces the engine-wide `WrapperIndex`.

mod body_analysis;
mod chain;
mod resolve;

use std::path::Path;

use endpointguard_core::config::HintsConfig;

use crate::model::{RouteHandler, WrapperAnalysis, WrapperIndex};
use crate::parsers::TypeScriptParser;
use crate::resolver::ModuleResolver;

pub use chain::{extract_chains, WrapperChain};

/// Build the project-wide wrapper index by running Phase A (chain
/// extraction) over every route, then Phase B/C exactly once per distinct
/// wrapper name, and Phase D aggregation per occurrence.
pub fn build_index(
    routes: &[RouteHandler],
    root: &Path,
    resolver: &ModuleResolver,
    hints: &HintsConfig,
) -> WrapperIndex {
    let mut index: WrapperIndex = WrapperIndex::new();
    let mut parser = match TypeScriptParser::new() {
        Ok(p) => p,
        Err(_) => return index,
    };

    for route in routes {
        let route_path = root.join(&route.file);
        let Ok(text) = std::fs::read_to_string(&route_path) else {
            continue;
        };

        for wrapper_chain in chain::extract_chains(&text) {
            for name in &wrapper_chain.chain {
                if !index.contains_key(name) {
                    let analysis = analyze_new_wrapper(name, &route_path, &text, root, resolver, &mut parser, hints);
                    index.insert(name.clone(), analysis);
                }
                let entry = index.get_mut(name).expect("just inserted or pre-existing");
                entry.usage_count += 1;
                entry.usage_files.push(route.file.clone());
                if route.signals.mutation_evidence {
                    entry.mutation_route_count += 1;
                }
            }
        }
    }

    index
}

fn analyze_new_wrapper(
    name: &str,
    route_path: &Path,
    route_text: &str,
    root: &Path,
    resolver: &ModuleResolver,
    parser: &mut TypeScriptParser,
    hints: &HintsConfig,
) -> WrapperAnalysis {
    let mut analysis = WrapperAnalysis::unresolved(name);

    let Some(def_path) = resolve::resolve_definition_file(name, route_path, route_text, resolver, parser) else {
        return analysis;
    };
    analysis.resolved = true;
    analysis.definition_file = Some(def_path.strip_prefix(root).unwrap_or(&def_path).to_string_lossy().replace('\\', "/"));

    let def_text = std::fs::read_to_string(&def_path).unwrap_or_default();
    let parsed = parser.parse(&def_text);
    analysis.evidence =
        body_analysis::analyze_body(&parsed, name, &def_text, &hints.auth.functions, &hints.rate_limit.wrappers);

    analysis
}
