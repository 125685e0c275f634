use std::collections::BTreeMap;

use crate::model::Cloud;

/// Built-in AWS aliases. Keys are lower-case; values are the short tokens
/// that show up in provider resource names.
pub const AWS_SYNONYMS: &[(&str, &str)] = &[
    ("elastic kubernetes service", "eks"),
    ("eks", "eks"),
    ("elastic container service", "ecs"),
    ("ecs", "ecs"),
    ("elastic compute cloud", "ec2"),
    ("ec2", "ec2"),
    ("simple storage service", "s3"),
    ("s3", "s3"),
    ("relational database service", "db"),
    ("rds", "db"),
    ("aurora", "rds_cluster"),
    ("lambda", "lambda"),
    ("dynamodb", "dynamodb"),
    ("cloudfront", "cloudfront"),
    ("cloudwatch", "cloudwatch"),
    ("bedrock", "bedrock"),
    ("sagemaker", "sagemaker"),
    ("opensearch service", "opensearch"),
    ("opensearch", "opensearch"),
    ("elasticache", "elasticache"),
    ("simple queue service", "sqs"),
    ("sqs", "sqs"),
    ("simple notification service", "sns"),
    ("sns", "sns"),
    ("virtual private cloud", "vpc"),
    ("vpc", "vpc"),
    ("identity and access management", "iam"),
    ("iam", "iam"),
    ("route 53", "route53"),
    ("step functions", "sfn"),
    ("eventbridge", "cloudwatch_event"),
    ("api gateway", "api_gateway"),
];

pub const AZURE_SYNONYMS: &[(&str, &str)] = &[
    ("azure kubernetes service", "kubernetes_cluster"),
    ("aks", "kubernetes_cluster"),
    ("virtual machines", "virtual_machine"),
    ("virtual machine", "virtual_machine"),
    ("blob storage", "storage"),
    ("storage", "storage"),
    ("cosmos db", "cosmosdb"),
    ("cosmosdb", "cosmosdb"),
    ("sql database", "mssql"),
    ("app service", "app_service"),
    ("functions", "function_app"),
    ("key vault", "key_vault"),
    ("container apps", "container_app"),
    ("openai", "cognitive"),
    ("ai services", "cognitive"),
    ("front door", "cdn_frontdoor"),
    ("monitor", "monitor"),
];

pub const GCP_SYNONYMS: &[(&str, &str)] = &[
    ("google kubernetes engine", "container"),
    ("gke", "container"),
    ("compute engine", "compute"),
    ("cloud storage", "storage"),
    ("cloud sql", "sql"),
    ("bigquery", "bigquery"),
    ("cloud run", "cloud_run"),
    ("cloud functions", "cloudfunctions"),
    ("pub/sub", "pubsub"),
    ("pubsub", "pubsub"),
    ("vertex ai", "vertex_ai"),
    ("spanner", "spanner"),
    ("alloydb", "alloydb"),
    ("memorystore", "redis"),
    ("firestore", "firestore"),
];

/// Every built-in alias, tagged with the cloud it belongs to.
pub fn builtin_synonyms() -> impl Iterator<Item = (Option<Cloud>, String, String)> {
    [
        (Cloud::Aws, AWS_SYNONYMS),
        (Cloud::Azure, AZURE_SYNONYMS),
        (Cloud::Gcp, GCP_SYNONYMS),
    ]
    .into_iter()
    .flat_map(|(cloud, table)| {
        table
            .iter()
            .map(move |(alias, token)| (Some(cloud), alias.to_string(), token.to_string()))
    })
}

/// One alias → token mapping. `cloud: None` applies to every cloud.
#[derive(Debug, Clone)]
struct Mapping {
    cloud: Option<Cloud>,
    token: String,
}

/// Canonicalizes free-text service labels.
///
/// Aliases are scoped: an Azure alias never rewrites an AWS label. When an
/// alias is defined more than once for the same cloud, the later entry wins.
#[derive(Debug, Clone)]
pub struct Normalizer {
    table: BTreeMap<String, Vec<Mapping>>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::scoped(builtin_synonyms())
    }
}

impl Normalizer {
    /// Aliases that apply to every cloud.
    pub fn new(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        Self::scoped(entries.into_iter().map(|(alias, token)| (None, alias, token)))
    }

    pub fn scoped(entries: impl IntoIterator<Item = (Option<Cloud>, String, String)>) -> Self {
        let mut table: BTreeMap<String, Vec<Mapping>> = BTreeMap::new();
        for (cloud, alias, token) in entries {
            table.entry(alias.trim().to_lowercase()).or_default().push(Mapping {
                cloud,
                token: token.trim().to_lowercase(),
            });
        }
        Self { table }
    }

    fn lookup(&self, alias: &str, cloud: Cloud) -> Option<&str> {
        self.table
            .get(alias)?
            .iter()
            .rev()
            .find(|m| m.cloud.map_or(true, |c| c == cloud))
            .map(|m| m.token.as_str())
    }

    fn aliases_for(&self, cloud: Cloud) -> impl Iterator<Item = &String> {
        self.table
            .iter()
            .filter(move |(_, mappings)| mappings.iter().any(|m| m.cloud.map_or(true, |c| c == cloud)))
            .map(|(alias, _)| alias)
    }

    /// Lower-case the label and map it through `cloud`'s aliases. Labels with
    /// no alias come back lower-cased and otherwise untouched.
    pub fn normalize(&self, label: &str, cloud: Cloud) -> String {
        let lower = label.trim().to_lowercase();
        match self.lookup(&lower, cloud) {
            Some(token) => token.to_string(),
            None => lower,
        }
    }

    /// Longest alias of `cloud` that occurs in `text` as a whole-word phrase.
    pub fn find_alias<'a>(&'a self, text: &str, cloud: Cloud) -> Option<&'a str> {
        let haystack = format!(" {} ", words_only(&text.to_lowercase()));
        self.aliases_for(cloud)
            .filter(|alias| haystack.contains(&format!(" {} ", words_only(alias))))
            .max_by_key(|alias| alias.len())
            .map(String::as_str)
    }

    /// Longest alias of `cloud` that `text` starts with, on a word boundary.
    pub fn leading_alias<'a>(&'a self, text: &str, cloud: Cloud) -> Option<&'a str> {
        let haystack = format!("{} ", words_only(&text.to_lowercase()));
        self.aliases_for(cloud)
            .filter(|alias| haystack.starts_with(&format!("{} ", words_only(alias))))
            .max_by_key(|alias| alias.len())
            .map(String::as_str)
    }

    /// Number of distinct aliases.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

fn words_only(s: &str) -> String {
    s.split(|c: char| !(c.is_alphanumeric() || c == '/'))
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alias_maps_to_token() {
        let n = Normalizer::default();
        assert_eq!(n.normalize("Elastic Kubernetes Service", Cloud::Aws), "eks");
        assert_eq!(n.normalize("  AKS ", Cloud::Azure), "kubernetes_cluster");
    }

    #[test]
    fn aliases_stay_in_their_cloud() {
        let n = Normalizer::default();
        assert_eq!(n.normalize("Functions", Cloud::Azure), "function_app");
        assert_eq!(n.normalize("Functions", Cloud::Aws), "functions");
        assert_eq!(n.normalize("AKS", Cloud::Gcp), "aks");
    }

    #[test]
    fn unknown_label_is_lowercased() {
        let n = Normalizer::default();
        assert_eq!(n.normalize("Widget", Cloud::Aws), "widget");
        assert_eq!(n.normalize("", Cloud::Aws), "");
    }

    #[test]
    fn custom_table_applies_everywhere() {
        let n = Normalizer::new([("Fancy DB".to_string(), "FDB".to_string())]);
        assert_eq!(n.normalize("fancy db", Cloud::Aws), "fdb");
        assert_eq!(n.normalize("fancy db", Cloud::Gcp), "fdb");
        assert_eq!(n.len(), 1);
    }

    #[test]
    fn later_entry_overrides_builtin() {
        let n = Normalizer::scoped(
            builtin_synonyms().chain([(None, "lambda".to_string(), "lambda_function".to_string())]),
        );
        assert_eq!(n.normalize("Lambda", Cloud::Aws), "lambda_function");
    }

    #[test]
    fn find_alias_prefers_longest_whole_phrase() {
        let n = Normalizer::default();
        assert_eq!(
            n.find_alias("Amazon Elastic Kubernetes Service (EKS) adds hybrid nodes", Cloud::Aws),
            Some("elastic kubernetes service")
        );
        assert_eq!(n.find_alias("Cloud SQL for PostgreSQL 17", Cloud::Gcp), Some("cloud sql"));
        // "ecs" must not match inside "specs"
        assert_eq!(n.find_alias("new specs published", Cloud::Aws), None);
    }

    #[test]
    fn find_alias_ignores_other_clouds() {
        let n = Normalizer::default();
        assert_eq!(n.find_alias("Python 3.13 functions", Cloud::Aws), None);
        assert_eq!(n.find_alias("Python 3.13 functions", Cloud::Azure), Some("functions"));
    }

    #[test]
    fn leading_alias_needs_word_boundary() {
        let n = Normalizer::default();
        assert_eq!(n.leading_alias("S3 adds a new storage class", Cloud::Aws), Some("s3"));
        assert_eq!(n.leading_alias("Route 53 Resolver", Cloud::Aws), Some("route 53"));
        assert_eq!(n.leading_alias("S3x something", Cloud::Aws), None);
        assert_eq!(n.leading_alias("adds S3", Cloud::Aws), None);
    }
}
