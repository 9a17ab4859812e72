/// Coarse classification of node rejections, used to print an actionable hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeErrorKind {
    AccountNotActivated,
    NoFrozenBalance,
    InsufficientBalance,
    Other,
}

impl NodeErrorKind {
    pub fn hint(self) -> Option<&'static str> {
        match self {
            Self::AccountNotActivated => {
                Some("account is not activated: send at least 1 TRX to it first")
            }
            Self::NoFrozenBalance => Some("no frozen balance: freeze TRX for energy first"),
            Self::InsufficientBalance => {
                Some("insufficient balance: top up TRX (amount + fees) and retry")
            }
            Self::Other => None,
        }
    }
}

/// Maps a node error message (already hex-decoded) to a [`NodeErrorKind`].
pub fn classify_node_error(message: &str) -> NodeErrorKind {
    let m = message.to_ascii_lowercase();
    if m.contains("does not exist") || m.contains("not exist") || m.contains("not activated") {
        NodeErrorKind::AccountNotActivated
    } else if m.contains("no frozen") || m.contains("available freeze") {
        NodeErrorKind::NoFrozenBalance
    } else if m.contains("balance is not sufficient")
        || m.contains("insufficient")
        || m.contains("not enough")
        || m.contains("less than or equal to accountbalance")
    {
        NodeErrorKind::InsufficientBalance
    } else {
        NodeErrorKind::Other
    }
}

/// Walks an `anyhow` chain and classifies the first recognizable message.
pub fn classify_error(err: &anyhow::Error) -> NodeErrorKind {
    err.chain()
        .map(|e| classify_node_error(&e.to_string()))
        .find(|k| *k != NodeErrorKind::Other)
        .unwrap_or(NodeErrorKind::Other)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_common_node_messages() {
        assert_eq!(
            classify_node_error("Validate TransferContract error, account [T...] does not exist"),
            NodeErrorKind::AccountNotActivated
        );
        assert_eq!(
            classify_node_error("no frozenBalance(Energy)"),
            NodeErrorKind::NoFrozenBalance
        );
        assert_eq!(
            classify_node_error("Validate TransferContract error, balance is not sufficient."),
            NodeErrorKind::InsufficientBalance
        );
        assert_eq!(
            classify_node_error(
                "delegateBalance must be less than or equal to available FreezeEnergyV2 balance"
            ),
            NodeErrorKind::NoFrozenBalance
        );
        assert_eq!(
            classify_node_error("frozenBalance must be less than or equal to accountBalance"),
            NodeErrorKind::InsufficientBalance
        );
        assert_eq!(classify_node_error("timeout"), NodeErrorKind::Other);
        assert!(NodeErrorKind::Other.hint().is_none());
        assert!(NodeErrorKind::InsufficientBalance.hint().is_some());
    }

    #[test]
    fn classify_error_looks_through_context() {
        let err = anyhow::anyhow!("balance is not sufficient").context("send TRX");
        assert_eq!(classify_error(&err), NodeErrorKind::InsufficientBalance);
    }
}
