use crate::mappings::Mappings;
use crate::template::rule::{rule_component, RuleComponent, OPERATOR_EQUAL, OPERATOR_NOT_EQUAL};
use crate::template::BlockBuilder;

/// Generate consolidated tax-report rules for every company × report pair.
///
/// Each report fans out to its configured jobs; reports missing from the
/// mapping table are skipped silently (the operator may mix known and
/// site-specific names). Blocks are separated by blank lines.
pub fn consolidated_tax_rules(
    companies: &[String],
    reports: &[String],
    mappings: &Mappings,
) -> String {
    let mut blocks = Vec::new();

    for company in companies {
        for report in reports {
            let Some(jobs) = mappings.tax_report_jobs.get(report) else {
                continue;
            };
            for job in jobs {
                blocks.push(company_rule(report, job, company));
            }
        }
    }

    blocks.join("\n\n")
}

/// One routing rule sending a company's pages of a report job to its folder.
fn company_rule(report: &str, job: &str, company: &str) -> String {
    let rule = BlockBuilder::new("RULE")
        .field("RULESETNAME", format!("{report}-{job}"))
        .field("SEQUENCE", company)
        .field("DESCRIPTION", format!("Company {company} - {report}"))
        .field("INACTIVE", "N")
        .field("PAGEEXCLUSIVE", "N")
        .field("BEGINENDRULE", "Y")
        .field("ENDEXCLUSIVE", "Y")
        .field("BYPASSFIRSTPAGEENDCHECK", "Y")
        .field("RULESETEXCLUSIVE", "N")
        .field(
            "DESTINATIONNAME",
            format!("/Reports/{report}-{job}~{company}/"),
        )
        .render();

    let begin = rule_component(&RuleComponent {
        variable: "&RPT_COMPANY",
        operator: OPERATOR_EQUAL,
        value: company,
        compare_length: 3,
        is_end: false,
    });
    let end = rule_component(&RuleComponent {
        variable: "&RPT_COMPANY",
        operator: OPERATOR_NOT_EQUAL,
        value: company,
        compare_length: 3,
        is_end: true,
    });

    format!("{rule}\n{begin}\n{end}")
}
