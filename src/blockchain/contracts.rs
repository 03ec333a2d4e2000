//! Contract bindings for the platform suite.
//!
//! Event signatures must stay byte-identical to the deployed ABIs: the topic
//! hash is derived from the name and parameter types below.

use alloy::sol;

sol! {
    /// Entry point that knows where the rest of the suite lives.
    #[sol(rpc)]
    interface IPlatformRegistry {
        function approvalRegistry() external view returns (address);
        function propertyFactory() external view returns (address);
        function revenueDistributor() external view returns (address);
    }
}

sol! {
    /// KYC-style user approvals.
    #[sol(rpc)]
    interface IApprovalRegistry {
        /// Emitted when a user becomes approved.
        #[derive(Debug)]
        event Approved(address indexed user);

        function isApproved(address user) external view returns (bool);
        function approveUser(address user) external;
    }
}

sol! {
    /// Deploys the paired non-fungible registry and fungible supply per property.
    #[sol(rpc)]
    interface IPropertyFactory {
        /// Emitted once per created property; both addresses come from the same tx.
        #[derive(Debug, PartialEq, Eq)]
        event PropertyRegistered(
            address indexed asset,
            address indexed token,
            address indexed owner,
            string metadataCID,
            uint256 valuation
        );

        /// Emitted on approve/reject.
        #[derive(Debug)]
        event PropertyStatusChanged(address indexed asset, uint8 status);

        function createProperty(
            address owner,
            string name,
            string symbol,
            string metadataCID,
            uint256 valuation,
            uint256 totalSupply,
            string tokenName,
            string tokenSymbol
        ) external returns (address asset, address token);

        function approveProperty(address asset) external;
        function rejectProperty(address asset) external;
    }
}

sol! {
    /// Revenue pool keyed by property token.
    #[sol(rpc)]
    interface IRevenueDistributor {
        #[derive(Debug, PartialEq, Eq)]
        event RevenueDeposited(
            uint256 indexed id,
            address indexed token,
            uint256 amount,
            uint256 snapshotId,
            address stablecoin
        );

        function depositRevenue(address token, address stablecoin, uint256 amount) external;
    }
}

sol! {
    /// Fungible property shares (18 decimals).
    #[sol(rpc)]
    interface IPropertyToken {
        function balanceOf(address holder) external view returns (uint256);
        function transfer(address to, uint256 amount) external returns (bool);
    }
}

pub use IPropertyFactory::PropertyRegistered;
pub use IRevenueDistributor::RevenueDeposited;
