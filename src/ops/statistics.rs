// SPDX-License-Identifier: PMPL-1.0-or-later

//! Surface-based statistical tests with cluster-level permutation inference

use super::{kernel, Operation};
use crate::args::ArgCursor;
use crate::error::{CommandError, CommandResult};
use crate::io;
use crate::kernels::statistics::{
    self, ClusterGeometry, PermutationSettings, TestResult, TwoSampleTest, VarianceSmoothing,
};
use crate::model::layers::MetricFile;
use crate::model::BrainSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::info;

/// Base seed for the permutation generators; results are reproducible.
const PERMUTATION_SEED: u64 = 1_175_493;

pub(super) const OPERATIONS: &[Operation] = &[
    Operation {
        flag: "-metric-statistics-one-sample-t-test",
        title: "METRIC STATISTICS ONE SAMPLE T-TEST",
        params: &[
            "<coord-file>",
            "<topo-file>",
            "<input-metric-file>",
            "<distortion-shape-file>",
            "<distortion-column-number>",
            "<output-t-map-metric-file>",
            "<output-report-text-file>",
            "<negative-threshold>",
            "<positive-threshold>",
            "<p-value>",
            "<variance-smoothing-iterations>",
            "<variance-smoothing-strength>",
            "<permutation-iterations>",
            "<test-value>",
            "<number-of-threads>",
        ],
        description: STATS_DESCRIPTION,
        needs_gui: false,
        execute: one_sample,
    },
    Operation {
        flag: "-metric-statistics-paired-t-test",
        title: "METRIC STATISTICS PAIRED T-TEST",
        params: &[
            "<coord-file>",
            "<topo-file>",
            "<input-metric-file-a>",
            "<input-metric-file-b>",
            "<distortion-shape-file>",
            "<distortion-column-number>",
            "<output-t-map-metric-file>",
            "<output-report-text-file>",
            "<negative-threshold>",
            "<positive-threshold>",
            "<p-value>",
            "<variance-smoothing-iterations>",
            "<variance-smoothing-strength>",
            "<permutation-iterations>",
            "<number-of-threads>",
        ],
        description: STATS_DESCRIPTION,
        needs_gui: false,
        execute: paired,
    },
    Operation {
        flag: "-metric-statistics-two-sample",
        title: "METRIC STATISTICS TWO SAMPLE",
        params: &[
            "<test>",
            "<coord-file>",
            "<topo-file>",
            "<input-metric-file-a>",
            "<input-metric-file-b>",
            "<distortion-shape-file>",
            "<distortion-column-number>",
            "<output-statistic-metric-file>",
            "<output-report-text-file>",
            "<negative-threshold>",
            "<positive-threshold>",
            "<p-value>",
            "<variance-smoothing-iterations>",
            "<variance-smoothing-strength>",
            "<permutation-iterations>",
            "<number-of-threads>",
        ],
        description: "Compare two groups of subjects with a T test or a Wilcoxon\n\
                      rank-sum test.  Tests: T WILCOXON.  Variance smoothing\n\
                      applies to the T test only.\n\
                      \n\
                      Pass NULL as the distortion shape file to use the surface's\n\
                      own node areas.  Cluster significance comes from permuting\n\
                      subjects between the groups; threads only speed this up.",
        needs_gui: false,
        execute: two_sample,
    },
    Operation {
        flag: "-metric-statistics-interhemispheric-clusters",
        title: "METRIC STATISTICS INTERHEMISPHERIC CLUSTERS",
        params: &[
            "<coord-file>",
            "<topo-file>",
            "<left-metric-file-a>",
            "<right-metric-file-a>",
            "<left-metric-file-b>",
            "<right-metric-file-b>",
            "<distortion-shape-file>",
            "<distortion-column-number>",
            "<output-t-map-metric-file>",
            "<output-report-text-file>",
            "<negative-threshold>",
            "<positive-threshold>",
            "<p-value>",
            "<variance-smoothing-iterations>",
            "<variance-smoothing-strength>",
            "<permutation-iterations>",
            "<number-of-threads>",
        ],
        description: "Compare hemispheric asymmetry between two groups.  Both
                      hemispheres are metrics on the same atlas surface with one
                      column per subject, in the same subject order.  Each
                      subject's left minus right difference enters a two-sample
                      T test of group A against group B; cluster significance
                      comes from permuting subjects between the groups.",
        needs_gui: false,
        execute: interhemispheric,
    },
    Operation {
        flag: "-metric-statistics-coordinate-difference",
        title: "METRIC STATISTICS COORDINATE DIFFERENCE",
        params: &[
            "<coord-file>",
            "<topo-file>",
            "<distortion-shape-file>",
            "<distortion-column-number>",
            "<output-statistic-metric-file>",
            "<output-report-text-file>",
            "<negative-threshold>",
            "<positive-threshold>",
            "<p-value>",
            "<variance-smoothing-iterations>",
            "<variance-smoothing-strength>",
            "<permutation-iterations>",
            "<number-of-threads>",
            "-a <coord-file> <coord-file> [coord-file...]",
            "-b <coord-file> <coord-file> [coord-file...]",
        ],
        description: "Search for clusters where two groups of surfaces differ in
                      shape.  Each coordinate file after -a or -b is one subject
                      registered to the atlas given by the first coordinate and
                      topology files.  The statistic is the distance between the
                      group mean positions over the pooled spread of the subjects;
                      it is never negative, so only the positive threshold forms
                      clusters.  Cluster significance comes from permuting
                      subjects between the groups.",
        needs_gui: false,
        execute: coordinate_difference,
    },
    Operation {
        flag: "-metric-statistics-anova-one-way",
        title: "METRIC STATISTICS ANOVA ONE WAY",
        params: &[
            "<coord-file>",
            "<topo-file>",
            "<distortion-shape-file>",
            "<distortion-column-number>",
            "<output-f-map-metric-file>",
            "<output-report-text-file>",
            "<f-threshold>",
            "<p-value>",
            "<permutation-iterations>",
            "<number-of-threads>",
            "<group-metric-file> <group-metric-file> [group-metric-file...]",
        ],
        description: "One-way analysis of variance with one metric file per group\n\
                      and one column per subject.  Clusters are nodes at or above\n\
                      the F threshold; their significance comes from permuting\n\
                      subjects between the groups.",
        needs_gui: false,
        execute: anova,
    },
];

const STATS_DESCRIPTION: &str = "Each metric column is one subject.  The statistic map is\n\
     written to the output metric file.  Clusters are connected nodes at or\n\
     below the negative threshold or at or above the positive threshold; a\n\
     cluster's significance is the fraction of permutations whose largest\n\
     cluster is at least as large.  Clusters at or below the p-value are\n\
     marked significant in the report.\n\
     \n\
     Pass NULL as the distortion shape file to use the surface's own node\n\
     areas; otherwise areas are divided by 2^distortion.  Zero variance\n\
     smoothing iterations turns smoothing off.  Threads only speed up the\n\
     permutations.";

/// Parameters shared by every test, parsed in command-line order.
struct Common {
    distortion: Option<(PathBuf, usize)>,
    output_map: PathBuf,
    report: PathBuf,
    settings: PermutationSettings,
    p_value: f32,
    smoothing: Option<VarianceSmoothing>,
}

fn next_distortion(args: &mut ArgCursor) -> CommandResult<Option<(PathBuf, usize)>> {
    let shape = args.next_optional_filename("Distortion shape file")?;
    let column = args.next_column("Distortion column number")?;
    Ok(shape.map(|path| (path, column)))
}

fn next_p_value(args: &mut ArgCursor) -> CommandResult<f32> {
    let p = args.next_float("P-value")?;
    if p <= 0.0 || p > 1.0 {
        return Err(CommandError::usage(
            "P-value",
            format!("\"{}\" is not between 0 and 1", p),
        ));
    }
    Ok(p)
}

fn next_threads(args: &mut ArgCursor) -> CommandResult<usize> {
    let threads = args.next_count("Number of threads")?;
    if threads == 0 {
        return Err(CommandError::usage("Number of threads", "must be at least 1"));
    }
    Ok(threads)
}

fn next_smoothing(args: &mut ArgCursor) -> CommandResult<Option<VarianceSmoothing>> {
    let iterations = args.next_count("Variance smoothing iterations")?;
    let strength = args.next_float("Variance smoothing strength")?;
    if !(0.0..=1.0).contains(&strength) {
        return Err(CommandError::usage(
            "Variance smoothing strength",
            format!("\"{}\" is not between 0 and 1", strength),
        ));
    }
    Ok((iterations > 0).then_some(VarianceSmoothing {
        strength,
        iterations,
    }))
}

/// Everything after the input metrics of the t and Wilcoxon tests. The
/// one-sample test reads its test value just before the thread count.
fn next_common(args: &mut ArgCursor, test_value: bool) -> CommandResult<(Common, f32)> {
    let distortion = next_distortion(args)?;
    let output_map = args.next_filename("Output statistic metric file")?;
    let report = args.next_filename("Output report text file")?;
    let negative_threshold = args.next_float("Negative threshold")?;
    let positive_threshold = args.next_float("Positive threshold")?;
    let p_value = next_p_value(args)?;
    let smoothing = next_smoothing(args)?;
    let iterations = args.next_count("Permutation iterations")?;
    let mu = if test_value {
        args.next_float("Test value")?
    } else {
        0.0
    };
    let threads = next_threads(args)?;
    let common = Common {
        distortion,
        output_map,
        report,
        settings: PermutationSettings {
            negative_threshold,
            positive_threshold,
            iterations,
            threads,
            seed: PERMUTATION_SEED,
        },
        p_value,
        smoothing,
    };
    Ok((common, mu))
}

/// Surface geometry with areas corrected for distortion when requested.
fn load_geometry(
    set: &BrainSet,
    distortion: &Option<(PathBuf, usize)>,
) -> CommandResult<ClusterGeometry> {
    let surface = set.surface(0)?;
    let mut geometry = ClusterGeometry::from_surface(surface);
    if let Some((path, column)) = distortion {
        let shape = io::read_surface_shape(path)?;
        if shape.node_count != surface.node_count() {
            return Err(CommandError::domain(
                format!("{} nodes in {}", surface.node_count(), path.display()),
                format!("{} nodes", shape.node_count),
            ));
        }
        kernel("Areal Distortion Correction", geometry.correct_areas(shape.column(*column)?))?;
    }
    Ok(geometry)
}

fn load_subjects(set: &mut BrainSet, path: &Path) -> CommandResult<Vec<Vec<f32>>> {
    Ok(set.load_metric(path)?.columns.clone())
}

fn write_outputs(
    common: &Common,
    result: &TestResult,
    statistic_name: &str,
    title: &str,
) -> CommandResult<()> {
    let mut map = MetricFile::new(result.statistic.len());
    map.add_column(statistic_name, result.statistic.clone())?;
    io::write_metric(&map, &common.output_map)?;
    io::write_text(&report(common, result, title), &common.report)?;
    let significant = result
        .clusters
        .iter()
        .filter(|c| c.p_value <= common.p_value)
        .count();
    info!(
        "{}: {} clusters, {} significant",
        title,
        result.clusters.len(),
        significant
    );
    Ok(())
}

fn report(common: &Common, result: &TestResult, title: &str) -> String {
    let s = &common.settings;
    let mut out = String::new();
    let _ = writeln!(out, "{}", title);
    let _ = writeln!(out, "nodes: {}", result.statistic.len());
    let _ = writeln!(out, "negative threshold: {}", s.negative_threshold);
    let _ = writeln!(out, "positive threshold: {}", s.positive_threshold);
    let _ = writeln!(out, "p-value: {}", common.p_value);
    let _ = writeln!(out, "permutations: {}", s.iterations);
    if let Some(smoothing) = &common.smoothing {
        let _ = writeln!(
            out,
            "variance smoothing: {} iterations, strength {}",
            smoothing.iterations, smoothing.strength
        );
    }
    if let Some((path, column)) = &common.distortion {
        let _ = writeln!(out, "distortion: {} column {}", path.display(), column + 1);
    }
    if !result.null_areas.is_empty() {
        let index = ((1.0 - common.p_value) * result.null_areas.len() as f32) as usize;
        let critical = result.null_areas[index.min(result.null_areas.len() - 1)];
        let _ = writeln!(out, "critical cluster area: {}", critical);
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "sign   nodes   area   p-value   significant   first-node");
    for cluster in &result.clusters {
        let _ = writeln!(
            out,
            "{:+}   {}   {}   {}   {}   {}",
            cluster.sign,
            cluster.nodes.len(),
            cluster.area,
            cluster.p_value,
            cluster.p_value <= common.p_value,
            cluster.nodes.first().copied().unwrap_or(0),
        );
    }
    out
}

fn one_sample(args: &mut ArgCursor) -> CommandResult<()> {
    let coord = args.next_filename("Coordinate file")?;
    let topo = args.next_filename("Topology file")?;
    let metric = args.next_filename("Input metric file")?;
    let (common, mu) = next_common(args, true)?;
    args.finish()?;

    let mut set = BrainSet::from_topo_coord(&topo, &coord)?;
    let subjects = load_subjects(&mut set, &metric)?;
    let geometry = load_geometry(&set, &common.distortion)?;
    let result = kernel(
        "One-Sample T-Test",
        statistics::one_sample_test(
            &geometry,
            &subjects,
            mu,
            common.smoothing.as_ref(),
            &common.settings,
        ),
    )?;
    write_outputs(&common, &result, "T-Statistic", "One-Sample T-Test")
}

fn paired(args: &mut ArgCursor) -> CommandResult<()> {
    let coord = args.next_filename("Coordinate file")?;
    let topo = args.next_filename("Topology file")?;
    let metric_a = args.next_filename("Input metric file A")?;
    let metric_b = args.next_filename("Input metric file B")?;
    let (common, _) = next_common(args, false)?;
    args.finish()?;

    let mut set = BrainSet::from_topo_coord(&topo, &coord)?;
    let a = load_subjects(&mut set, &metric_a)?;
    let b = load_subjects(&mut set, &metric_b)?;
    let geometry = load_geometry(&set, &common.distortion)?;
    let differences = kernel("Paired T-Test", statistics::paired_differences(&a, &b))?;
    let result = kernel(
        "Paired T-Test",
        statistics::one_sample_test(
            &geometry,
            &differences,
            0.0,
            common.smoothing.as_ref(),
            &common.settings,
        ),
    )?;
    write_outputs(&common, &result, "T-Statistic", "Paired T-Test")
}

fn two_sample(args: &mut ArgCursor) -> CommandResult<()> {
    let test = args.next_enum::<TwoSampleTest>("Test", true)?;
    let coord = args.next_filename("Coordinate file")?;
    let topo = args.next_filename("Topology file")?;
    let metric_a = args.next_filename("Input metric file A")?;
    let metric_b = args.next_filename("Input metric file B")?;
    let (common, _) = next_common(args, false)?;
    args.finish()?;

    let mut set = BrainSet::from_topo_coord(&topo, &coord)?;
    let a = load_subjects(&mut set, &metric_a)?;
    let b = load_subjects(&mut set, &metric_b)?;
    let geometry = load_geometry(&set, &common.distortion)?;
    let (statistic_name, title) = match test {
        TwoSampleTest::T => ("T-Statistic", "Two-Sample T-Test"),
        TwoSampleTest::Wilcoxon => ("Wilcoxon Z", "Wilcoxon Rank-Sum Test"),
    };
    let result = kernel(
        title,
        statistics::two_sample_test(
            &geometry,
            &a,
            &b,
            test,
            common.smoothing.as_ref(),
            &common.settings,
        ),
    )?;
    write_outputs(&common, &result, statistic_name, title)
}

fn anova(args: &mut ArgCursor) -> CommandResult<()> {
    let coord = args.next_filename("Coordinate file")?;
    let topo = args.next_filename("Topology file")?;
    let distortion = next_distortion(args)?;
    let output_map = args.next_filename("Output F map metric file")?;
    let report = args.next_filename("Output report text file")?;
    let threshold = args.next_float("F threshold")?;
    let p_value = next_p_value(args)?;
    let iterations = args.next_count("Permutation iterations")?;
    let threads = next_threads(args)?;
    let groups: Vec<PathBuf> = args.next_rest().into_iter().map(PathBuf::from).collect();
    if groups.len() < 2 {
        return Err(CommandError::usage(
            "Group metric file",
            format!("at least 2 groups are required, {} given", groups.len()),
        ));
    }

    let mut set = BrainSet::from_topo_coord(&topo, &coord)?;
    let subjects = groups
        .iter()
        .map(|path| load_subjects(&mut set, path))
        .collect::<CommandResult<Vec<_>>>()?;
    let geometry = load_geometry(&set, &distortion)?;
    let common = Common {
        distortion,
        output_map,
        report,
        settings: PermutationSettings {
            negative_threshold: f32::NEG_INFINITY,
            positive_threshold: threshold,
            iterations,
            threads,
            seed: PERMUTATION_SEED,
        },
        p_value,
        smoothing: None,
    };
    let result = kernel(
        "One-Way ANOVA",
        statistics::anova_test(&geometry, &subjects, &common.settings),
    )?;
    write_outputs(&common, &result, "F-Statistic", "One-Way ANOVA")
}

fn interhemispheric(args: &mut ArgCursor) -> CommandResult<()> {
    let coord = args.next_filename("Coordinate file")?;
    let topo = args.next_filename("Topology file")?;
    let left_a = args.next_filename("Left metric file A")?;
    let right_a = args.next_filename("Right metric file A")?;
    let left_b = args.next_filename("Left metric file B")?;
    let right_b = args.next_filename("Right metric file B")?;
    let (common, _) = next_common(args, false)?;
    args.finish()?;

    let mut set = BrainSet::from_topo_coord(&topo, &coord)?;
    let left_a = load_subjects(&mut set, &left_a)?;
    let right_a = load_subjects(&mut set, &right_a)?;
    let left_b = load_subjects(&mut set, &left_b)?;
    let right_b = load_subjects(&mut set, &right_b)?;
    let geometry = load_geometry(&set, &common.distortion)?;
    let result = kernel(
        "Interhemispheric Clusters",
        statistics::interhemispheric_test(
            &geometry,
            &left_a,
            &right_a,
            &left_b,
            &right_b,
            common.smoothing.as_ref(),
            &common.settings,
        ),
    )?;
    write_outputs(&common, &result, "T-Statistic", "Interhemispheric Clusters")
}

/// `-a <files...> -b <files...>` in that order.
fn split_groups(rest: Vec<String>) -> CommandResult<(Vec<PathBuf>, Vec<PathBuf>)> {
    let mut tokens = rest.into_iter();
    match tokens.next() {
        Some(marker) if marker == "-a" => {}
        other => {
            return Err(CommandError::usage(
                "Group A",
                format!("expected -a, found \"{}\"", other.unwrap_or_default()),
            ))
        }
    }
    let mut a = Vec::new();
    let mut b = Vec::new();
    let mut in_b = false;
    for token in tokens {
        if token == "-b" && !in_b {
            in_b = true;
        } else if in_b {
            b.push(PathBuf::from(token));
        } else {
            a.push(PathBuf::from(token));
        }
    }
    for (name, group) in [("Group A", &a), ("Group B", &b)] {
        if group.len() < 2 {
            return Err(CommandError::usage(
                name,
                format!("at least 2 coordinate files are required, {} given", group.len()),
            ));
        }
    }
    Ok((a, b))
}

fn load_positions(paths: &[PathBuf], nodes: usize) -> CommandResult<Vec<Vec<[f32; 3]>>> {
    paths
        .iter()
        .map(|path| {
            let coords = io::read_coord(path)?;
            if coords.node_count() != nodes {
                return Err(CommandError::domain(
                    format!("{} nodes in {}", nodes, path.display()),
                    format!("{} nodes", coords.node_count()),
                ));
            }
            Ok(coords.points)
        })
        .collect()
}

fn coordinate_difference(args: &mut ArgCursor) -> CommandResult<()> {
    let coord = args.next_filename("Coordinate file")?;
    let topo = args.next_filename("Topology file")?;
    let (common, _) = next_common(args, false)?;
    let (group_a, group_b) = split_groups(args.next_rest())?;

    let set = BrainSet::from_topo_coord(&topo, &coord)?;
    let nodes = set.surface(0)?.node_count();
    let a = load_positions(&group_a, nodes)?;
    let b = load_positions(&group_b, nodes)?;
    let geometry = load_geometry(&set, &common.distortion)?;
    let result = kernel(
        "Coordinate Difference",
        statistics::coordinate_difference_test(
            &geometry,
            &a,
            &b,
            common.smoothing.as_ref(),
            &common.settings,
        ),
    )?;
    write_outputs(&common, &result, "Coordinate Difference", "Coordinate Difference")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(text: &str) -> Vec<String> {
        text.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn coordinate_groups_split_on_markers() {
        let (a, b) = split_groups(tokens("-a s1.coord s2.coord -b s3.coord s4.coord s5.coord")).unwrap();
        assert_eq!(a, [PathBuf::from("s1.coord"), PathBuf::from("s2.coord")]);
        assert_eq!(b.len(), 3);
    }

    #[test]
    fn coordinate_groups_need_two_surfaces_each() {
        let err = split_groups(tokens("-a s1.coord -b s3.coord s4.coord")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "ERROR: Group A: at least 2 coordinate files are required, 1 given"
        );
        let err = split_groups(tokens("s1.coord s2.coord -b s3.coord s4.coord")).unwrap_err();
        assert!(err.is_usage());
        assert!(split_groups(tokens("-a s1.coord s2.coord")).is_err());
    }
}
