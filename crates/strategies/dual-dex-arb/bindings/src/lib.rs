use ethers::contract::abigen;

// Settlement contract that routes one trade through two routers in a single transaction
abigen!(
    DualDexArb,
    r#"[
        function estimateDualDexTrade(address router1, address router2, address token1, address token2, uint256 amount) external view returns (uint256)
        function dualDexTrade(address router1, address router2, address token1, address token2, uint256 amount) external
    ]"#
);

// ERC20 interface for tracked base assets
abigen!(
    ERC20,
    r#"[
        function balanceOf(address account) external view returns (uint256)
    ]"#
);
