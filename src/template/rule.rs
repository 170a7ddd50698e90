use crate::template::{pad_identifier, BlockBuilder};

/// Comparison operators the target system accepts in rule components.
pub const OPERATOR_EQUAL: &str = "Equal";
pub const OPERATOR_NOT_EQUAL: &str = "Not Equal";

/// Parameters for a commitment-book routing rule.
#[derive(Debug, Clone)]
pub struct CommitmentRule<'a> {
    pub report: &'a str,
    pub job: &'a str,
    pub store_number: &'a str,
    /// Report variable the begin/end components compare against.
    pub variable: &'a str,
    pub queue: &'a str,
    pub sequence: u32,
}

impl<'a> CommitmentRule<'a> {
    pub fn new(
        report: &'a str,
        job: &'a str,
        store_number: &'a str,
        variable: &'a str,
        queue: &'a str,
    ) -> Self {
        Self {
            report,
            job,
            store_number,
            variable,
            queue,
            sequence: 23,
        }
    }
}

/// One begin or end component of a rule.
#[derive(Debug, Clone)]
pub struct RuleComponent<'a> {
    pub variable: &'a str,
    pub operator: &'a str,
    pub value: &'a str,
    pub compare_length: u32,
    pub is_end: bool,
}

/// Render a commitment-book rule with its begin/end component pair.
///
/// The rule delivers to a folder destination and a printer destination;
/// `DESTINATIONNAME` legitimately appears twice. The begin component fires
/// when the store variable matches, the end component closes the range when
/// it stops matching.
pub fn commitment_rule(params: &CommitmentRule<'_>) -> String {
    let store = pad_identifier(params.store_number);
    let folder_dest = format!("/Reports/{}-{}~{store}/", params.report, params.job);
    let printer_dest = format!("{}~STORE{}~001", params.queue, params.store_number);
    let description = format!("{folder_dest}  [{printer_dest}]");

    let rule = BlockBuilder::new("RULE")
        .field("RULESETNAME", format!("{}-{}", params.report, params.job))
        .field("SEQUENCE", params.sequence.to_string())
        .field("DESCRIPTION", description)
        .field("INACTIVE", "N")
        .field("PAGEEXCLUSIVE", "N")
        .field("BEGINENDRULE", "Y")
        .field("ENDEXCLUSIVE", "Y")
        .field("BYPASSFIRSTPAGEENDCHECK", "Y")
        .field("RULESETEXCLUSIVE", "N")
        .field("DONOTDELIVERPAGETODEST", "N")
        .field("DESTINATIONNAME", folder_dest)
        .field("DESTINATIONNAME", printer_dest)
        .render();

    let begin = rule_component(&RuleComponent {
        variable: params.variable,
        operator: OPERATOR_EQUAL,
        value: &store,
        compare_length: 4,
        is_end: false,
    });
    let end = rule_component(&RuleComponent {
        variable: params.variable,
        operator: OPERATOR_NOT_EQUAL,
        value: &store,
        compare_length: 4,
        is_end: true,
    });

    format!("{rule}\n{begin}\n{end}")
}

/// Render a `RULECOMPONENT` sub-block, indented one margin under its rule.
pub fn rule_component(component: &RuleComponent<'_>) -> String {
    BlockBuilder::new("RULECOMPONENT")
        .field("OPENPARENTHESISCOUNT", "0")
        .field("VARIABLE", component.variable)
        .field("OPERATOR", component.operator)
        .field("VALUE", component.value)
        .field("COMPARELENGTH", component.compare_length.to_string())
        .field("CLOSEPARENTHESISCOUNT", "0")
        .field("ENDCOMPONENT", if component.is_end { "Y" } else { "N" })
        .field("ISROWCOLLEN", "N")
        .field("ISROWCOLROWCOL", "N")
        .field("ENFORCEBOUNDARY", "N")
        .field("NUMERICCOMPARE", "N")
        .field("BOOLEANCOMPARE", "N")
        .field("CASESENSITIVE", "N")
        .field("CONTAINSWILDCARD", "N")
        .field("CONTAINSVARIABLE", "N")
        .field("USEPREVIOUSPAGEVALUE", "N")
        .indented(1)
        .render()
}
