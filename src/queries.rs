//! SQL for the chart queries.
//!
//! The dataset identifier is validated by [crate::cli::parse_dataset] before it reaches these
//! functions.

use crate::qq::Subtype;

/// Q-Q plot query.
///
/// Selects control and case frequencies for the AIS, IIS and JIS subtypes, dropping nulls and
/// negative frequencies. Up to `sample_size` random rows are drawn per subtype.
///
/// # Arguments
///
/// * `dataset`: `project.dataset` holding `variant_subtype_metrics`
/// * `sample_size`: Maximum rows per subtype
pub fn qq_plot_sql(dataset: &str, sample_size: u32) -> String {
    let subtypes = Subtype::ALL
        .iter()
        .map(|s| format!("'{}'", s))
        .collect::<Vec<_>>()
        .join(",");
    format!(
        "SELECT
    subtype,
    control_percent,
    percent_diff,
    (control_percent + percent_diff) AS case_percent
FROM `{dataset}.variant_subtype_metrics`
WHERE subtype IN ({subtypes})
  AND control_percent IS NOT NULL
  AND percent_diff IS NOT NULL
  AND control_percent >= 0
  AND (control_percent + percent_diff) >= 0
QUALIFY ROW_NUMBER() OVER (PARTITION BY subtype ORDER BY RAND()) <= {sample_size}
"
    )
}

/// AF vs gnomAD AF scatter query.
///
/// Annotations are deduplicated by variant ID before joining against the subtype comparison
/// table.
///
/// # Arguments
///
/// * `dataset`: `project.dataset` holding `combined_annotations` and
///   `compare_subtype_control_clean`
pub fn scatter_sql(dataset: &str) -> String {
    format!(
        "WITH annotations_dedup AS (
    SELECT
        ID,
        ANY_VALUE(symbol) AS symbol,
        ANY_VALUE(SAFE_CAST(AF AS FLOAT64)) AS af,
        ANY_VALUE(SAFE_CAST(gnomADg_AF AS FLOAT64)) AS gnomad_af,
        ANY_VALUE(CANONICAL) AS canonical,
        ANY_VALUE(Consequence) AS consequence,
        ANY_VALUE(VARIANT_CLASS) AS variant_class,
        ANY_VALUE(BIOTYPE) AS biotype,
        ANY_VALUE(SIFT) AS sift,
        ANY_VALUE(CHROM) AS chromosome
    FROM `{dataset}.combined_annotations`
    GROUP BY ID
)

SELECT
    a.ID,
    a.symbol,
    c.subtype,
    a.af,
    a.gnomad_af,
    (a.gnomad_af - a.af) AS mean_diff,
    a.canonical,
    a.consequence,
    a.variant_class,
    a.biotype,
    a.sift,
    a.chromosome
FROM annotations_dedup a
INNER JOIN `{dataset}.compare_subtype_control_clean` c
ON a.ID = c.id
"
    )
}
