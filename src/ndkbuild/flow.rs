//! Flow analysis from terminal outputs back to source files.
//!
//! Every classified command contributes edges `input -> output` to a file
//! graph. Outputs with no outgoing edge are never consumed by another
//! command; they are the terminal outputs (normally the final `.so` files).
//! Walking the graph backwards from a terminal output reaches every compile
//! command that contributed to it, through any number of archive and link
//! steps.

use std::collections::{BTreeSet, HashMap, HashSet};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::Serialize;

use super::classifier::{Classification, StepKind};
use super::command_line::CommandLine;

/// A compile command and the one source file it compiles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct BuildStepInfo {
    pub command: CommandLine,
    pub only_input: String,
}

/// A terminal output and the compile steps that feed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TerminalOutput {
    pub output: String,
    /// In transcript order.
    pub steps: Vec<BuildStepInfo>,
}

/// Files as nodes, classification indices as edges.
#[derive(Debug, Default)]
struct FileGraph {
    graph: DiGraph<String, usize>,
    nodes: HashMap<String, NodeIndex>,
}

impl FileGraph {
    fn node(&mut self, file: &str) -> NodeIndex {
        if let Some(&node) = self.nodes.get(file) {
            return node;
        }
        let node = self.graph.add_node(file.to_string());
        self.nodes.insert(file.to_string(), node);
        node
    }

    fn is_consumed(&self, node: NodeIndex) -> bool {
        self.graph
            .neighbors_directed(node, Direction::Outgoing)
            .next()
            .is_some()
    }

    /// Indices of all classifications upstream of `node`.
    fn contributing_steps(&self, node: NodeIndex) -> BTreeSet<usize> {
        let mut steps = BTreeSet::new();
        let mut visited = HashSet::new();
        let mut stack = vec![node];

        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            for edge in self.graph.edges_directed(current, Direction::Incoming) {
                steps.insert(*edge.weight());
                stack.push(edge.source());
            }
        }

        steps
    }
}

/// Map every terminal output to the compile steps it is built from.
///
/// Terminal outputs are returned in the order they are first produced in
/// the transcript.
pub fn analyze(classifications: &[Classification]) -> Vec<TerminalOutput> {
    let mut files = FileGraph::default();
    let mut produced = Vec::new();
    let mut seen = HashSet::new();

    for (index, step) in classifications.iter().enumerate() {
        for output in &step.outputs {
            let output_node = files.node(output);
            if seen.insert(output_node) {
                produced.push(output_node);
            }
            for input in &step.inputs {
                let input_node = files.node(input);
                files.graph.add_edge(input_node, output_node, index);
            }
        }
    }

    let terminals: Vec<TerminalOutput> = produced
        .into_iter()
        .filter(|&node| !files.is_consumed(node))
        .map(|node| {
            let steps = files
                .contributing_steps(node)
                .into_iter()
                .map(|index| &classifications[index])
                .filter(|step| step.kind == StepKind::Compile)
                .filter_map(|step| {
                    step.inputs.first().map(|input| BuildStepInfo {
                        command: step.command.clone(),
                        only_input: input.clone(),
                    })
                })
                .collect();
            TerminalOutput {
                output: files.graph[node].clone(),
                steps,
            }
        })
        .collect();

    tracing::debug!(
        "found {} terminal outputs in {} build steps",
        terminals.len(),
        classifications.len()
    );
    terminals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ndkbuild::classifier::classify;
    use crate::ndkbuild::conventions::PosixFileConventions;

    fn analyze_transcript(transcript: &str) -> Vec<TerminalOutput> {
        analyze(&classify(transcript, &PosixFileConventions))
    }

    fn inputs(output: &TerminalOutput) -> Vec<&str> {
        output.steps.iter().map(|s| s.only_input.as_str()).collect()
    }

    #[test]
    fn test_compile_then_link() {
        let outputs = analyze_transcript(
            "clang -c a.c -o a.o\nclang -c b.cpp -o b.o\nclang -o libfoo.so a.o b.o\n",
        );
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].output, "libfoo.so");
        assert_eq!(inputs(&outputs[0]), vec!["a.c", "b.cpp"]);
    }

    #[test]
    fn test_through_static_archive() {
        let outputs = analyze_transcript(
            "clang -c u.c -o u.o\n\
             ar crsD libutil.a u.o\n\
             clang -c main.c -o main.o\n\
             clang -o libapp.so main.o libutil.a\n",
        );
        assert_eq!(outputs.len(), 1);
        assert_eq!(inputs(&outputs[0]), vec!["u.c", "main.c"]);
    }

    #[test]
    fn test_multiple_terminals_in_production_order() {
        let outputs = analyze_transcript(
            "clang -c b.c -o b.o\n\
             clang -o libb.so b.o\n\
             clang -c a.c -o a.o\n\
             clang -o liba.so a.o\n",
        );
        let names: Vec<_> = outputs.iter().map(|o| o.output.as_str()).collect();
        assert_eq!(names, vec!["libb.so", "liba.so"]);
    }

    #[test]
    fn test_standalone_archive_is_terminal() {
        let outputs = analyze_transcript("clang -c s.c -o s.o\nar rcs libs.a s.o\n");
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].output, "libs.a");
    }

    #[test]
    fn test_file_compiled_twice_keeps_both_commands() {
        let outputs = analyze_transcript(
            "clang -c a.c -o a1.o\n\
             clang -DOTHER -c a.c -o a2.o\n\
             clang -o libfoo.so a1.o a2.o\n",
        );
        assert_eq!(inputs(&outputs[0]), vec!["a.c", "a.c"]);
        assert_ne!(outputs[0].steps[0].command, outputs[0].steps[1].command);
    }

    #[test]
    fn test_shared_intermediate_is_counted_once() {
        // u.o reaches libfoo.so directly and through libutil.a.
        let outputs = analyze_transcript(
            "clang -c u.c -o u.o\n\
             ar rcs libutil.a u.o\n\
             clang -o libfoo.so u.o libutil.a\n",
        );
        assert_eq!(inputs(&outputs[0]), vec!["u.c"]);
    }

    #[test]
    fn test_cycle_terminates() {
        let outputs = analyze_transcript(
            "clang -c a.c -o a.o\n\
             ar rcs liba.a a.o liba.a\n\
             clang -o libfoo.so liba.a\n",
        );
        assert_eq!(outputs.len(), 1);
        assert_eq!(inputs(&outputs[0]), vec!["a.c"]);
    }

    #[test]
    fn test_empty() {
        assert!(analyze(&[]).is_empty());
    }
}
