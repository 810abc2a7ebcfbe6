//! Report custom resources collected on every cycle.

pub const REPORT_GROUP: &str = "aquasecurity.github.io";
pub const REPORT_VERSION: &str = "v1alpha1";

/// One collectible report kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReportResource {
    /// Plural resource name used for API addressing, e.g. `vulnerabilityreports`.
    pub name: &'static str,
    pub kind: &'static str,
    /// Output file stem, e.g. `vulnerability-reports`.
    pub file_name: &'static str,
}

impl ReportResource {
    pub const fn new(name: &'static str, kind: &'static str, file_name: &'static str) -> Self {
        Self {
            name,
            kind,
            file_name,
        }
    }

    pub fn group(&self) -> &'static str {
        REPORT_GROUP
    }

    pub fn version(&self) -> &'static str {
        REPORT_VERSION
    }

    pub fn api_version(&self) -> String {
        format!("{}/{}", REPORT_GROUP, REPORT_VERSION)
    }
}

// SBOM reports are left out on purpose; they dominate storage.
pub const REPORT_RESOURCES: &[ReportResource] = &[
    ReportResource::new("vulnerabilityreports", "VulnerabilityReport", "vulnerability-reports"),
    ReportResource::new("configauditreports", "ConfigAuditReport", "config-audit-reports"),
    ReportResource::new(
        "clusterconfigauditreports",
        "ClusterConfigAuditReport",
        "cluster-config-audit-reports",
    ),
    ReportResource::new(
        "clusterrbacassessmentreports",
        "ClusterRbacAssessmentReport",
        "cluster-rbac-assessment-reports",
    ),
    ReportResource::new("exposedsecretreports", "ExposedSecretReport", "exposed-secret-reports"),
    ReportResource::new(
        "clustercompliancereports",
        "ClusterComplianceReport",
        "cluster-compliance-reports",
    ),
    ReportResource::new(
        "clustervulnerabilityreports",
        "ClusterVulnerabilityReport",
        "cluster-vulnerability-reports",
    ),
    ReportResource::new("rbacassessmentreports", "RbacAssessmentReport", "rbac-assessment-reports"),
];
