use super::constants::*;
use std::fmt;

/// Known ATT PDU opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttOpcode {
    ErrorResponse,
    ExchangeMtuRequest,
    ExchangeMtuResponse,
    FindInformationRequest,
    FindInformationResponse,
    FindByTypeValueRequest,
    FindByTypeValueResponse,
    ReadByTypeRequest,
    ReadByTypeResponse,
    ReadRequest,
    ReadResponse,
    ReadBlobRequest,
    ReadBlobResponse,
    ReadMultipleRequest,
    ReadMultipleResponse,
    ReadByGroupTypeRequest,
    ReadByGroupTypeResponse,
    WriteRequest,
    WriteResponse,
    WriteCommand,
    SignedWriteCommand,
    PrepareWriteRequest,
    PrepareWriteResponse,
    ExecuteWriteRequest,
    ExecuteWriteResponse,
    HandleValueNotification,
    HandleValueIndication,
    HandleValueConfirmation,
    ReadMultipleVariableRequest,
    ReadMultipleVariableResponse,
    MultipleHandleValueNotification,
}

impl AttOpcode {
    /// Decode the first byte of an ATT PDU
    pub fn from_u8(value: u8) -> Option<Self> {
        let opcode = match value {
            ATT_ERROR_RSP => Self::ErrorResponse,
            ATT_EXCHANGE_MTU_REQ => Self::ExchangeMtuRequest,
            ATT_EXCHANGE_MTU_RSP => Self::ExchangeMtuResponse,
            ATT_FIND_INFO_REQ => Self::FindInformationRequest,
            ATT_FIND_INFO_RSP => Self::FindInformationResponse,
            ATT_FIND_BY_TYPE_VALUE_REQ => Self::FindByTypeValueRequest,
            ATT_FIND_BY_TYPE_VALUE_RSP => Self::FindByTypeValueResponse,
            ATT_READ_BY_TYPE_REQ => Self::ReadByTypeRequest,
            ATT_READ_BY_TYPE_RSP => Self::ReadByTypeResponse,
            ATT_READ_REQ => Self::ReadRequest,
            ATT_READ_RSP => Self::ReadResponse,
            ATT_READ_BLOB_REQ => Self::ReadBlobRequest,
            ATT_READ_BLOB_RSP => Self::ReadBlobResponse,
            ATT_READ_MULTIPLE_REQ => Self::ReadMultipleRequest,
            ATT_READ_MULTIPLE_RSP => Self::ReadMultipleResponse,
            ATT_READ_BY_GROUP_TYPE_REQ => Self::ReadByGroupTypeRequest,
            ATT_READ_BY_GROUP_TYPE_RSP => Self::ReadByGroupTypeResponse,
            ATT_WRITE_REQ => Self::WriteRequest,
            ATT_WRITE_RSP => Self::WriteResponse,
            ATT_WRITE_CMD => Self::WriteCommand,
            ATT_SIGNED_WRITE_CMD => Self::SignedWriteCommand,
            ATT_PREPARE_WRITE_REQ => Self::PrepareWriteRequest,
            ATT_PREPARE_WRITE_RSP => Self::PrepareWriteResponse,
            ATT_EXECUTE_WRITE_REQ => Self::ExecuteWriteRequest,
            ATT_EXECUTE_WRITE_RSP => Self::ExecuteWriteResponse,
            ATT_HANDLE_VALUE_NTF => Self::HandleValueNotification,
            ATT_HANDLE_VALUE_IND => Self::HandleValueIndication,
            ATT_HANDLE_VALUE_CONF => Self::HandleValueConfirmation,
            ATT_READ_MULTIPLE_VARIABLE_REQ => Self::ReadMultipleVariableRequest,
            ATT_READ_MULTIPLE_VARIABLE_RSP => Self::ReadMultipleVariableResponse,
            ATT_MULTIPLE_HANDLE_VALUE_NTF => Self::MultipleHandleValueNotification,
            _ => return None,
        };
        Some(opcode)
    }

    pub fn value(&self) -> u8 {
        match self {
            Self::ErrorResponse => ATT_ERROR_RSP,
            Self::ExchangeMtuRequest => ATT_EXCHANGE_MTU_REQ,
            Self::ExchangeMtuResponse => ATT_EXCHANGE_MTU_RSP,
            Self::FindInformationRequest => ATT_FIND_INFO_REQ,
            Self::FindInformationResponse => ATT_FIND_INFO_RSP,
            Self::FindByTypeValueRequest => ATT_FIND_BY_TYPE_VALUE_REQ,
            Self::FindByTypeValueResponse => ATT_FIND_BY_TYPE_VALUE_RSP,
            Self::ReadByTypeRequest => ATT_READ_BY_TYPE_REQ,
            Self::ReadByTypeResponse => ATT_READ_BY_TYPE_RSP,
            Self::ReadRequest => ATT_READ_REQ,
            Self::ReadResponse => ATT_READ_RSP,
            Self::ReadBlobRequest => ATT_READ_BLOB_REQ,
            Self::ReadBlobResponse => ATT_READ_BLOB_RSP,
            Self::ReadMultipleRequest => ATT_READ_MULTIPLE_REQ,
            Self::ReadMultipleResponse => ATT_READ_MULTIPLE_RSP,
            Self::ReadByGroupTypeRequest => ATT_READ_BY_GROUP_TYPE_REQ,
            Self::ReadByGroupTypeResponse => ATT_READ_BY_GROUP_TYPE_RSP,
            Self::WriteRequest => ATT_WRITE_REQ,
            Self::WriteResponse => ATT_WRITE_RSP,
            Self::WriteCommand => ATT_WRITE_CMD,
            Self::SignedWriteCommand => ATT_SIGNED_WRITE_CMD,
            Self::PrepareWriteRequest => ATT_PREPARE_WRITE_REQ,
            Self::PrepareWriteResponse => ATT_PREPARE_WRITE_RSP,
            Self::ExecuteWriteRequest => ATT_EXECUTE_WRITE_REQ,
            Self::ExecuteWriteResponse => ATT_EXECUTE_WRITE_RSP,
            Self::HandleValueNotification => ATT_HANDLE_VALUE_NTF,
            Self::HandleValueIndication => ATT_HANDLE_VALUE_IND,
            Self::HandleValueConfirmation => ATT_HANDLE_VALUE_CONF,
            Self::ReadMultipleVariableRequest => ATT_READ_MULTIPLE_VARIABLE_REQ,
            Self::ReadMultipleVariableResponse => ATT_READ_MULTIPLE_VARIABLE_RSP,
            Self::MultipleHandleValueNotification => ATT_MULTIPLE_HANDLE_VALUE_NTF,
        }
    }

    /// Commands expect no response
    pub fn is_command(&self) -> bool {
        self.value() & ATT_OPCODE_COMMAND_FLAG != 0
    }
}

impl fmt::Display for AttOpcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} (0x{:02X})", self, self.value())
    }
}
