pub mod defaults;

//
// Types
//
pub type ServerUrl = String;
pub type ClusterAlias = String;
pub type ProjectName = String;
pub type ServiceName = String;
pub type OperatorName = String;
pub type DistributionId = String;
