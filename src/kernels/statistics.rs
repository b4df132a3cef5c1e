// SPDX-License-Identifier: PMPL-1.0-or-later

//! Per-node statistical tests and cluster-level permutation inference
//!
//! Subjects are metric columns; every test produces one value per node.
//! Permutations run on a dedicated rayon pool and seed one `StdRng` per
//! permutation from the base seed, so results do not depend on the thread
//! count.

use crate::model::surface::Surface;
use anyhow::{bail, Context, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TwoSampleTest {
    #[value(name = "T")]
    T,
    #[value(name = "WILCOXON")]
    Wilcoxon,
}

/// Neighbourhood and area data copied out of a surface so that worker
/// threads can share it.
#[derive(Debug, Clone)]
pub struct ClusterGeometry {
    pub neighbors: Vec<Vec<usize>>,
    pub areas: Vec<f32>,
}

impl ClusterGeometry {
    pub fn from_surface(surface: &Surface) -> Self {
        Self {
            neighbors: surface.neighbor_lists().to_vec(),
            areas: surface.node_areas(),
        }
    }

    /// Undo areal distortion: `distortion` holds `log2(area / true area)`
    /// per node.
    pub fn correct_areas(&mut self, distortion: &[f32]) -> Result<()> {
        if distortion.len() != self.areas.len() {
            bail!(
                "distortion column has {} values for {} nodes",
                distortion.len(),
                self.areas.len()
            );
        }
        for (area, d) in self.areas.iter_mut().zip(distortion) {
            *area /= d.exp2();
        }
        Ok(())
    }

    pub fn node_count(&self) -> usize {
        self.areas.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VarianceSmoothing {
    pub strength: f32,
    pub iterations: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PermutationSettings {
    /// Clusters are runs of nodes at or below `negative_threshold` or at or
    /// above `positive_threshold`
    pub negative_threshold: f32,
    pub positive_threshold: f32,
    pub iterations: usize,
    pub threads: usize,
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    /// +1 for clusters above the positive threshold, -1 below the negative one
    pub sign: i8,
    pub nodes: Vec<usize>,
    pub area: f32,
    pub p_value: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestResult {
    pub statistic: Vec<f32>,
    pub clusters: Vec<Cluster>,
    /// Largest cluster area of each permutation, ascending
    pub null_areas: Vec<f32>,
}

fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f32>() / values.len() as f32
}

/// Unbiased sample variance.
fn variance(values: &[f32], mean: f32) -> f32 {
    if values.len() < 2 {
        return 0.0;
    }
    values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / (values.len() - 1) as f32
}

fn safe_ratio(num: f32, den: f32) -> f32 {
    if den > 0.0 && den.is_finite() {
        num / den
    } else {
        0.0
    }
}

fn smooth_values(geometry: &ClusterGeometry, values: &mut Vec<f32>, smoothing: &VarianceSmoothing) {
    for _ in 0..smoothing.iterations {
        let previous = values.clone();
        for (node, value) in values.iter_mut().enumerate() {
            let neighbors = &geometry.neighbors[node];
            if neighbors.is_empty() {
                continue;
            }
            let avg = neighbors.iter().map(|n| previous[*n]).sum::<f32>() / neighbors.len() as f32;
            *value = previous[node] * (1.0 - smoothing.strength) + avg * smoothing.strength;
        }
    }
}

fn check_subjects(subjects: &[Vec<f32>], nodes: usize, minimum: usize, what: &str) -> Result<()> {
    if subjects.len() < minimum {
        bail!("{} needs at least {} columns, found {}", what, minimum, subjects.len());
    }
    if let Some(bad) = subjects.iter().position(|s| s.len() != nodes) {
        bail!("column {} has {} nodes, expected {}", bad + 1, subjects[bad].len(), nodes);
    }
    Ok(())
}

/// One-sample t of `subjects - mu` at every node.
pub fn one_sample_t(
    subjects: &[Vec<f32>],
    mu: f32,
    geometry: Option<(&ClusterGeometry, &VarianceSmoothing)>,
) -> Vec<f32> {
    let nodes = subjects.first().map_or(0, Vec::len);
    let n = subjects.len() as f32;
    let mut means = Vec::with_capacity(nodes);
    let mut variances = Vec::with_capacity(nodes);
    let mut column = vec![0.0; subjects.len()];
    for node in 0..nodes {
        for (slot, s) in column.iter_mut().zip(subjects) {
            *slot = s[node] - mu;
        }
        let m = mean(&column);
        means.push(m);
        variances.push(variance(&column, m));
    }
    if let Some((geometry, smoothing)) = geometry {
        smooth_values(geometry, &mut variances, smoothing);
    }
    means
        .iter()
        .zip(&variances)
        .map(|(m, v)| safe_ratio(*m, (v / n).sqrt()))
        .collect()
}

/// Pooled-variance two-sample t at every node.
pub fn two_sample_t(
    a: &[Vec<f32>],
    b: &[Vec<f32>],
    geometry: Option<(&ClusterGeometry, &VarianceSmoothing)>,
) -> Vec<f32> {
    let nodes = a.first().map_or(0, Vec::len);
    let (na, nb) = (a.len() as f32, b.len() as f32);
    let mut diffs = Vec::with_capacity(nodes);
    let mut pooled = Vec::with_capacity(nodes);
    for node in 0..nodes {
        let xa: Vec<f32> = a.iter().map(|s| s[node]).collect();
        let xb: Vec<f32> = b.iter().map(|s| s[node]).collect();
        let (ma, mb) = (mean(&xa), mean(&xb));
        let (va, vb) = (variance(&xa, ma), variance(&xb, mb));
        diffs.push(ma - mb);
        pooled.push(((na - 1.0) * va + (nb - 1.0) * vb) / (na + nb - 2.0).max(1.0));
    }
    if let Some((geometry, smoothing)) = geometry {
        smooth_values(geometry, &mut pooled, smoothing);
    }
    diffs
        .iter()
        .zip(&pooled)
        .map(|(d, v)| safe_ratio(*d, (v * (1.0 / na + 1.0 / nb)).sqrt()))
        .collect()
}

/// Average ranks (1-based) with ties sharing their mean rank.
fn ranks(values: &[f32]) -> Vec<f32> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|x, y| values[*x].total_cmp(&values[*y]));
    let mut out = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        let rank = (start + end + 1) as f32 * 0.5;
        for idx in &order[start..end] {
            out[*idx] = rank;
        }
        start = end;
    }
    out
}

/// Wilcoxon rank-sum z score of group `a` against `b` at every node.
pub fn wilcoxon_z(a: &[Vec<f32>], b: &[Vec<f32>]) -> Vec<f32> {
    let nodes = a.first().map_or(0, Vec::len);
    let (na, nb) = (a.len() as f32, b.len() as f32);
    let expected = na * (na + nb + 1.0) * 0.5;
    let sd = (na * nb * (na + nb + 1.0) / 12.0).sqrt();
    (0..nodes)
        .map(|node| {
            let pooled: Vec<f32> = a.iter().chain(b).map(|s| s[node]).collect();
            let r = ranks(&pooled);
            let sum_a: f32 = r[..a.len()].iter().sum();
            safe_ratio(sum_a - expected, sd)
        })
        .collect()
}

/// One-way ANOVA F at every node.
pub fn anova_f(groups: &[Vec<Vec<f32>>]) -> Result<Vec<f32>> {
    if groups.len() < 2 {
        bail!("analysis of variance needs at least 2 groups, found {}", groups.len());
    }
    let nodes = groups[0].first().map_or(0, Vec::len);
    for group in groups {
        check_subjects(group, nodes, 1, "each group")?;
    }
    let k = groups.len() as f32;
    let total: usize = groups.iter().map(Vec::len).sum();
    let within_df = total as f32 - k;
    if within_df <= 0.0 {
        bail!("analysis of variance needs more subjects than groups");
    }
    Ok((0..nodes)
        .map(|node| {
            let group_values: Vec<Vec<f32>> = groups
                .iter()
                .map(|g| g.iter().map(|s| s[node]).collect())
                .collect();
            let grand = group_values.iter().flatten().sum::<f32>() / total as f32;
            let mut between = 0.0;
            let mut within = 0.0;
            for values in &group_values {
                let m = mean(values);
                between += values.len() as f32 * (m - grand).powi(2);
                within += values.iter().map(|v| (v - m).powi(2)).sum::<f32>();
            }
            safe_ratio(between / (k - 1.0), within / within_df)
        })
        .collect())
}

/// Connected supra-threshold regions in either tail.
pub fn find_clusters(geometry: &ClusterGeometry, statistic: &[f32], negative: f32, positive: f32) -> Vec<Cluster> {
    let mut visited = vec![false; statistic.len()];
    let mut clusters = Vec::new();
    for start in 0..statistic.len() {
        let sign: i8 = if statistic[start] >= positive {
            1
        } else if statistic[start] <= negative {
            -1
        } else {
            continue;
        };
        if visited[start] {
            continue;
        }
        let inside = |v: f32| {
            if sign > 0 {
                v >= positive
            } else {
                v <= negative
            }
        };
        let mut nodes = Vec::new();
        let mut stack = vec![start];
        visited[start] = true;
        while let Some(node) = stack.pop() {
            nodes.push(node);
            for n in &geometry.neighbors[node] {
                if !visited[*n] && inside(statistic[*n]) {
                    visited[*n] = true;
                    stack.push(*n);
                }
            }
        }
        nodes.sort_unstable();
        let area = nodes.iter().map(|n| geometry.areas[*n]).sum();
        clusters.push(Cluster {
            sign,
            nodes,
            area,
            p_value: 1.0,
        });
    }
    clusters
}

fn max_cluster_area(geometry: &ClusterGeometry, statistic: &[f32], settings: &PermutationSettings) -> f32 {
    find_clusters(
        geometry,
        statistic,
        settings.negative_threshold,
        settings.positive_threshold,
    )
        .iter()
        .map(|c| c.area)
        .fold(0.0, f32::max)
}

/// Maximum cluster area of each permuted statistic map, ascending.
fn permutation_null<F>(geometry: &ClusterGeometry, settings: &PermutationSettings, permuted: F) -> Result<Vec<f32>>
where
    F: Fn(&mut StdRng) -> Vec<f32> + Sync,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(settings.threads.max(1))
        .build()
        .context("unable to start permutation threads")?;
    debug!(
        "running {} permutations on {} threads",
        settings.iterations,
        pool.current_num_threads()
    );
    let mut areas: Vec<f32> = pool.install(|| {
        (0..settings.iterations)
            .into_par_iter()
            .map(|i| {
                let mut rng = StdRng::seed_from_u64(settings.seed.wrapping_add(i as u64));
                let statistic = permuted(&mut rng);
                max_cluster_area(geometry, &statistic, settings)
            })
            .collect()
    });
    areas.sort_by(f32::total_cmp);
    Ok(areas)
}

fn attach_p_values(clusters: &mut [Cluster], null_areas: &[f32]) {
    let n = null_areas.len() as f32;
    for cluster in clusters.iter_mut() {
        let at_least = null_areas.iter().filter(|a| **a >= cluster.area).count() as f32;
        cluster.p_value = (at_least + 1.0) / (n + 1.0);
    }
}

fn finish(
    geometry: &ClusterGeometry,
    statistic: Vec<f32>,
    settings: &PermutationSettings,
    null_areas: Vec<f32>,
) -> TestResult {
    let mut clusters = find_clusters(
        geometry,
        &statistic,
        settings.negative_threshold,
        settings.positive_threshold,
    );
    attach_p_values(&mut clusters, &null_areas);
    clusters.sort_by(|a, b| b.area.total_cmp(&a.area));
    TestResult {
        statistic,
        clusters,
        null_areas,
    }
}

/// One-sample test with sign-flip permutations. Paired tests pass the
/// per-subject differences with `mu` of zero.
pub fn one_sample_test(
    geometry: &ClusterGeometry,
    subjects: &[Vec<f32>],
    mu: f32,
    smoothing: Option<&VarianceSmoothing>,
    settings: &PermutationSettings,
) -> Result<TestResult> {
    check_subjects(subjects, geometry.node_count(), 2, "a one-sample test")?;
    let smooth = smoothing.map(|s| (geometry, s));
    let statistic = one_sample_t(subjects, mu, smooth);
    let centred: Vec<Vec<f32>> = subjects
        .iter()
        .map(|s| s.iter().map(|v| v - mu).collect())
        .collect();
    let null_areas = permutation_null(geometry, settings, |rng| {
        let flipped: Vec<Vec<f32>> = centred
            .iter()
            .map(|s| {
                if rng.gen_bool(0.5) {
                    s.iter().map(|v| -v).collect()
                } else {
                    s.clone()
                }
            })
            .collect();
        one_sample_t(&flipped, 0.0, smooth)
    })?;
    Ok(finish(geometry, statistic, settings, null_areas))
}

/// Paired differences `a[i] - b[i]` for the paired test.
pub fn paired_differences(a: &[Vec<f32>], b: &[Vec<f32>]) -> Result<Vec<Vec<f32>>> {
    if a.len() != b.len() {
        bail!("paired test needs equal column counts, found {} and {}", a.len(), b.len());
    }
    a.iter()
        .zip(b)
        .enumerate()
        .map(|(i, (x, y))| {
            if x.len() != y.len() {
                bail!("column {} has {} and {} nodes", i + 1, x.len(), y.len());
            }
            Ok(x.iter().zip(y).map(|(p, q)| p - q).collect())
        })
        .collect()
}

/// Two-sample test with group-label permutations.
pub fn two_sample_test(
    geometry: &ClusterGeometry,
    a: &[Vec<f32>],
    b: &[Vec<f32>],
    test: TwoSampleTest,
    smoothing: Option<&VarianceSmoothing>,
    settings: &PermutationSettings,
) -> Result<TestResult> {
    check_subjects(a, geometry.node_count(), 2, "the first group")?;
    check_subjects(b, geometry.node_count(), 2, "the second group")?;
    let smooth = smoothing.map(|s| (geometry, s));
    let compute = |x: &[Vec<f32>], y: &[Vec<f32>]| match test {
        TwoSampleTest::T => two_sample_t(x, y, smooth),
        TwoSampleTest::Wilcoxon => wilcoxon_z(x, y),
    };
    let statistic = compute(a, b);
    let pooled: Vec<&Vec<f32>> = a.iter().chain(b).collect();
    let null_areas = permutation_null(geometry, settings, |rng| {
        let mut order: Vec<usize> = (0..pooled.len()).collect();
        order.shuffle(rng);
        let (first, second) = order.split_at(a.len());
        let x: Vec<Vec<f32>> = first.iter().map(|i| pooled[*i].clone()).collect();
        let y: Vec<Vec<f32>> = second.iter().map(|i| pooled[*i].clone()).collect();
        compute(&x, &y)
    })?;
    Ok(finish(geometry, statistic, settings, null_areas))
}

/// Group comparison of hemispheric asymmetry. Each group has a left and a
/// right metric on the same atlas surface, columns paired by subject; the
/// statistic is the two-sample t of the per-subject `left - right`
/// differences, with group-label permutations.
pub fn interhemispheric_test(
    geometry: &ClusterGeometry,
    left_a: &[Vec<f32>],
    right_a: &[Vec<f32>],
    left_b: &[Vec<f32>],
    right_b: &[Vec<f32>],
    smoothing: Option<&VarianceSmoothing>,
    settings: &PermutationSettings,
) -> Result<TestResult> {
    let asymmetry_a = paired_differences(left_a, right_a).context("group A hemispheres")?;
    let asymmetry_b = paired_differences(left_b, right_b).context("group B hemispheres")?;
    two_sample_test(
        geometry,
        &asymmetry_a,
        &asymmetry_b,
        TwoSampleTest::T,
        smoothing,
        settings,
    )
}

fn mean_position(group: &[&Vec<[f32; 3]>], node: usize) -> [f32; 3] {
    let mut sum = [0.0; 3];
    for surface in group {
        for (s, p) in sum.iter_mut().zip(surface[node]) {
            *s += p;
        }
    }
    sum.map(|s| s / group.len().max(1) as f32)
}

fn distance(a: [f32; 3], b: [f32; 3]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum::<f32>().sqrt()
}

/// Separation of two groups of surfaces at every node: the distance between
/// the group mean positions over the pooled spread of subjects about their
/// own group mean. Never negative.
pub fn coordinate_difference(
    a: &[&Vec<[f32; 3]>],
    b: &[&Vec<[f32; 3]>],
    geometry: Option<(&ClusterGeometry, &VarianceSmoothing)>,
) -> Vec<f32> {
    let nodes = a.first().map_or(0, |s| s.len());
    let (na, nb) = (a.len() as f32, b.len() as f32);
    let mut distances = Vec::with_capacity(nodes);
    let mut spread = Vec::with_capacity(nodes);
    for node in 0..nodes {
        let (ma, mb) = (mean_position(a, node), mean_position(b, node));
        let squared: f32 = a
            .iter()
            .map(|s| distance(s[node], ma).powi(2))
            .chain(b.iter().map(|s| distance(s[node], mb).powi(2)))
            .sum();
        distances.push(distance(ma, mb));
        spread.push(squared / (na + nb - 2.0).max(1.0));
    }
    if let Some((geometry, smoothing)) = geometry {
        smooth_values(geometry, &mut spread, smoothing);
    }
    distances
        .iter()
        .zip(&spread)
        .map(|(d, v)| safe_ratio(*d, (v * (1.0 / na + 1.0 / nb)).sqrt()))
        .collect()
}

/// Coordinate-difference cluster search with group-label permutations.
/// Every surface must have one position per node of `geometry`.
pub fn coordinate_difference_test(
    geometry: &ClusterGeometry,
    a: &[Vec<[f32; 3]>],
    b: &[Vec<[f32; 3]>],
    smoothing: Option<&VarianceSmoothing>,
    settings: &PermutationSettings,
) -> Result<TestResult> {
    for (group, surfaces) in [("A", a), ("B", b)] {
        if surfaces.len() < 2 {
            bail!("group {} needs at least 2 surfaces, found {}", group, surfaces.len());
        }
        if let Some(bad) = surfaces.iter().position(|s| s.len() != geometry.node_count()) {
            bail!(
                "surface {} of group {} has {} nodes, expected {}",
                bad + 1,
                group,
                surfaces[bad].len(),
                geometry.node_count()
            );
        }
    }
    let smooth = smoothing.map(|s| (geometry, s));
    let pooled: Vec<&Vec<[f32; 3]>> = a.iter().chain(b).collect();
    let statistic = coordinate_difference(&pooled[..a.len()], &pooled[a.len()..], smooth);
    let null_areas = permutation_null(geometry, settings, |rng| {
        let mut shuffled = pooled.clone();
        shuffled.shuffle(rng);
        let (x, y) = shuffled.split_at(a.len());
        coordinate_difference(x, y, smooth)
    })?;
    Ok(finish(geometry, statistic, settings, null_areas))
}

/// One-way ANOVA with group-membership permutations. Only the positive
/// threshold of `settings` applies since F is never negative.
pub fn anova_test(
    geometry: &ClusterGeometry,
    groups: &[Vec<Vec<f32>>],
    settings: &PermutationSettings,
) -> Result<TestResult> {
    for group in groups {
        check_subjects(group, geometry.node_count(), 1, "each group")?;
    }
    let statistic = anova_f(groups)?;
    let sizes: Vec<usize> = groups.iter().map(Vec::len).collect();
    let pooled: Vec<&Vec<f32>> = groups.iter().flatten().collect();
    let null_areas = permutation_null(geometry, settings, |rng| {
        let mut order: Vec<usize> = (0..pooled.len()).collect();
        order.shuffle(rng);
        let mut rest = order.as_slice();
        let shuffled: Vec<Vec<Vec<f32>>> = sizes
            .iter()
            .map(|size| {
                let (head, tail) = rest.split_at(*size);
                rest = tail;
                head.iter().map(|i| pooled[*i].clone()).collect()
            })
            .collect();
        // group sizes match the validated input
        anova_f(&shuffled).unwrap_or_default()
    })?;
    Ok(finish(geometry, statistic, settings, null_areas))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::surface::tests::octahedron;

    fn subjects(rows: &[[f32; 6]]) -> Vec<Vec<f32>> {
        rows.iter().map(|r| r.to_vec()).collect()
    }

    #[test]
    fn one_sample_t_matches_hand_value() {
        // values 1, 2, 3: mean 2, sd 1, t = 2 / (1 / sqrt 3)
        let data = vec![vec![1.0], vec![2.0], vec![3.0]];
        let t = one_sample_t(&data, 0.0, None);
        assert!((t[0] - 2.0 * 3.0f32.sqrt()).abs() < 1e-4);
    }

    #[test]
    fn zero_variance_gives_zero_t() {
        let data = vec![vec![5.0], vec![5.0]];
        assert_eq!(one_sample_t(&data, 0.0, None), [0.0]);
    }

    #[test]
    fn ranks_average_ties() {
        assert_eq!(ranks(&[3.0, 1.0, 3.0, 2.0]), [3.5, 1.0, 3.5, 2.0]);
    }

    #[test]
    fn anova_separates_groups() {
        let g1 = vec![vec![1.0], vec![1.1], vec![0.9]];
        let g2 = vec![vec![5.0], vec![5.1], vec![4.9]];
        let f = anova_f(&[g1.clone(), g2]).unwrap();
        assert!(f[0] > 100.0);
        assert!(anova_f(&[g1]).is_err());
    }

    #[test]
    fn clusters_follow_topology() {
        let geometry = ClusterGeometry::from_surface(&octahedron());
        let stat = [3.0, -3.0, 3.0, 0.0, 0.0, 0.0];
        let clusters = find_clusters(&geometry, &stat, -2.0, 2.0);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].nodes, [0, 2]);
        assert_eq!(clusters[1].sign, -1);
    }

    #[test]
    fn permutations_are_deterministic_across_thread_counts() {
        let geometry = ClusterGeometry::from_surface(&octahedron());
        let data = subjects(&[
            [2.0, 0.1, 2.2, -0.3, 0.0, 0.2],
            [2.5, -0.2, 1.9, 0.1, 0.3, -0.1],
            [1.8, 0.3, 2.4, 0.2, -0.2, 0.0],
            [2.1, 0.0, 2.0, -0.1, 0.1, 0.1],
        ]);
        let mut settings = PermutationSettings {
            negative_threshold: -2.0,
            positive_threshold: 2.0,
            iterations: 20,
            threads: 1,
            seed: 7,
        };
        let one = one_sample_test(&geometry, &data, 0.0, None, &settings).unwrap();
        settings.threads = 3;
        let three = one_sample_test(&geometry, &data, 0.0, None, &settings).unwrap();
        assert_eq!(one, three);
        assert_eq!(one.null_areas.len(), 20);
        assert!(one.clusters.iter().all(|c| c.p_value > 0.0 && c.p_value <= 1.0));
    }

    #[test]
    fn distortion_correction_rescales_areas() {
        let mut geometry = ClusterGeometry::from_surface(&octahedron());
        let before = geometry.areas[0];
        geometry.correct_areas(&[1.0; 6]).unwrap();
        assert!((geometry.areas[0] - before / 2.0).abs() < 1e-6);
        assert!(geometry.correct_areas(&[0.0; 2]).is_err());
    }

    #[test]
    fn paired_needs_matching_columns() {
        let a = vec![vec![1.0, 2.0]];
        let b = vec![vec![1.0, 2.0], vec![0.0, 0.0]];
        assert!(paired_differences(&a, &b).is_err());
        let d = paired_differences(&a, &a).unwrap();
        assert_eq!(d, [vec![0.0, 0.0]]);
    }

    #[test]
    fn interhemispheric_asymmetry_separates_groups() {
        let geometry = ClusterGeometry::from_surface(&octahedron());
        let flat = [0.0; 6];
        let right = subjects(&[flat, flat, flat]);
        // group A is lateralised at nodes 0 and 2, group B is symmetric
        let left_a = subjects(&[
            [3.0, 0.1, 3.2, 0.0, 0.1, 0.0],
            [3.1, 0.0, 2.9, 0.1, 0.0, 0.1],
            [2.9, 0.1, 3.0, 0.0, 0.1, 0.0],
        ]);
        let left_b = subjects(&[
            [0.1, 0.0, 0.0, 0.1, 0.0, 0.1],
            [0.0, 0.1, 0.1, 0.0, 0.1, 0.0],
            [0.1, 0.1, 0.0, 0.1, 0.0, 0.1],
        ]);
        let settings = PermutationSettings {
            negative_threshold: -5.0,
            positive_threshold: 5.0,
            iterations: 10,
            threads: 2,
            seed: 11,
        };
        let result =
            interhemispheric_test(&geometry, &left_a, &right, &left_b, &right, None, &settings).unwrap();
        assert!(result.statistic[0] > 5.0);
        assert_eq!(result.clusters[0].nodes, [0, 2]);
        assert_eq!(result.null_areas.len(), 10);

        let short = subjects(&[flat, flat]);
        assert!(interhemispheric_test(&geometry, &left_a, &short, &left_b, &right, None, &settings).is_err());
    }

    #[test]
    fn coordinate_difference_measures_group_separation() {
        let base = octahedron().coords.points.clone();
        let jitter = |d: f32| -> Vec<[f32; 3]> { base.iter().map(|p| [p[0] + d, p[1], p[2]]).collect() };
        let a = vec![jitter(0.0), jitter(0.2)];
        let mut moved = jitter(0.1);
        moved[4][2] += 5.0;
        let mut moved_again = jitter(-0.1);
        moved_again[4][2] += 5.0;
        let b = vec![moved, moved_again];

        let pooled: Vec<&Vec<[f32; 3]>> = a.iter().chain(&b).collect();
        let stat = coordinate_difference(&pooled[..2], &pooled[2..], None);
        assert!(stat.iter().all(|v| *v >= 0.0));
        let top = stat.iter().copied().fold(0.0, f32::max);
        assert_eq!(stat[4], top);

        let geometry = ClusterGeometry::from_surface(&octahedron());
        let settings = PermutationSettings {
            negative_threshold: -1.0,
            positive_threshold: top * 0.5,
            iterations: 6,
            threads: 1,
            seed: 5,
        };
        let result = coordinate_difference_test(&geometry, &a, &b, None, &settings).unwrap();
        assert_eq!(result.clusters[0].nodes, [4]);
        assert_eq!(result.clusters[0].sign, 1);
        assert!(coordinate_difference_test(&geometry, &a[..1], &b, None, &settings).is_err());
    }

    #[test]
    fn anova_test_reports_one_positive_tail() {
        let geometry = ClusterGeometry::from_surface(&octahedron());
        let low = subjects(&[[0.0, 0.1, 0.0, 0.2, 0.1, 0.0], [0.1, 0.0, 0.2, 0.1, 0.0, 0.1]]);
        let high = subjects(&[[5.0, 0.0, 5.1, 0.1, 0.2, 0.1], [5.2, 0.1, 4.9, 0.0, 0.1, 0.2]]);
        let settings = PermutationSettings {
            negative_threshold: f32::NEG_INFINITY,
            positive_threshold: 10.0,
            iterations: 10,
            threads: 2,
            seed: 3,
        };
        let result = anova_test(&geometry, &[low, high], &settings).unwrap();
        assert_eq!(result.statistic.len(), 6);
        assert!(result.clusters.iter().all(|c| c.sign == 1));
        assert!(result.clusters.iter().any(|c| c.nodes.contains(&0)));
    }
}
