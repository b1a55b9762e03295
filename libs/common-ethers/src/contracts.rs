use ethers::contract::abigen;

abigen!(
    SmartKetubah,
    r"[
        function partner1() external view returns (address)

        function partner2() external view returns (address)

        function contractState() external view returns (uint8)

        function consent(address partner) external view returns (bool)

        function owner() external view returns (address)

        function recordConsent() external

        function witness(string message) external

        function initialize(address partner1, address partner2, string uri) external

        function transferOwnership(address newOwner) external

        event Witnessed(address witness, string message)
    ]"
);
