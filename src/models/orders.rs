// src/models/orders.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::models::auth::Role;

// Status de produção, compartilhado entre item e invoice. Os rótulos com
// espaço são valores de domínio fixos — fazem parte do contrato da API e
// das colunas enum do banco, então cada variante carrega o seu rename.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[sqlx(type_name = "item_status")]
pub enum ItemStatus {
    #[sqlx(rename = "Admin")]
    Admin,
    #[sqlx(rename = "Di Desain")]
    #[serde(rename = "Di Desain")]
    DiDesain,
    #[sqlx(rename = "Proses Desain")]
    #[serde(rename = "Proses Desain")]
    ProsesDesain,
    #[sqlx(rename = "Operator")]
    Operator,
    #[sqlx(rename = "Proses Cetak")]
    #[serde(rename = "Proses Cetak")]
    ProsesCetak,
    #[sqlx(rename = "Acc Admin")]
    #[serde(rename = "Acc Admin")]
    AccAdmin,
    #[sqlx(rename = "Selesai")]
    Selesai,
    #[sqlx(rename = "Dikirim")]
    Dikirim,
    #[sqlx(rename = "Sudah Diambil")]
    #[serde(rename = "Sudah Diambil")]
    SudahDiambil,
    #[sqlx(rename = "Batal")]
    Batal,
}

impl ItemStatus {
    pub const ALL: [ItemStatus; 10] = [
        ItemStatus::Admin,
        ItemStatus::DiDesain,
        ItemStatus::ProsesDesain,
        ItemStatus::Operator,
        ItemStatus::ProsesCetak,
        ItemStatus::AccAdmin,
        ItemStatus::Selesai,
        ItemStatus::Dikirim,
        ItemStatus::SudahDiambil,
        ItemStatus::Batal,
    ];

    // Rótulo de domínio, igual ao gravado no banco e trafegado no JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Admin => "Admin",
            ItemStatus::DiDesain => "Di Desain",
            ItemStatus::ProsesDesain => "Proses Desain",
            ItemStatus::Operator => "Operator",
            ItemStatus::ProsesCetak => "Proses Cetak",
            ItemStatus::AccAdmin => "Acc Admin",
            ItemStatus::Selesai => "Selesai",
            ItemStatus::Dikirim => "Dikirim",
            ItemStatus::SudahDiambil => "Sudah Diambil",
            ItemStatus::Batal => "Batal",
        }
    }

    // Estados terminais: daqui nada mais avança nem cancela.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemStatus::SudahDiambil | ItemStatus::Batal)
    }

    // Estados em que o item ainda está no fluxo de desenho e o
    // desainer pode cancelar.
    pub fn in_design_flow(&self) -> bool {
        matches!(self, ItemStatus::DiDesain | ItemStatus::ProsesDesain)
    }

    // Pares (esperado → próximo) das transições guardadas das bancadas.
    // Os UPDATEs condicionais dos repositórios vinculam exatamente estes
    // valores: a segunda chamada encontra o item já no próximo status e
    // não afeta linha alguma.
    pub const START_DESIGN: (ItemStatus, ItemStatus) =
        (ItemStatus::DiDesain, ItemStatus::ProsesDesain);
    pub const FINISH_DESIGN: (ItemStatus, ItemStatus) =
        (ItemStatus::ProsesDesain, ItemStatus::AccAdmin);
    pub const START_JOB: (ItemStatus, ItemStatus) =
        (ItemStatus::Operator, ItemStatus::ProsesCetak);
    pub const FINISH_JOB: (ItemStatus, ItemStatus) =
        (ItemStatus::ProsesCetak, ItemStatus::Selesai);

    pub fn can_start_design(&self) -> bool {
        *self == Self::START_DESIGN.0
    }

    pub fn can_finish_design(&self) -> bool {
        *self == Self::FINISH_DESIGN.0
    }

    pub fn can_start_job(&self) -> bool {
        *self == Self::START_JOB.0
    }

    pub fn can_finish_job(&self) -> bool {
        *self == Self::FINISH_JOB.0
    }

    pub fn can_cancel_design(&self) -> bool {
        self.in_design_flow()
    }

    pub fn can_cancel(&self) -> bool {
        !self.is_terminal()
    }

    // Conjuntos vinculados no filtro dos UPDATEs de cancelamento.
    pub fn design_cancelable() -> Vec<ItemStatus> {
        Self::ALL
            .into_iter()
            .filter(ItemStatus::can_cancel_design)
            .collect()
    }

    pub fn cancelable() -> Vec<ItemStatus> {
        Self::ALL.into_iter().filter(ItemStatus::can_cancel).collect()
    }

    // Tabela fixa status → papéis notificados. Status fora da tabela
    // (Admin, Proses Desain, Proses Cetak) não notificam ninguém.
    pub fn notified_roles(&self) -> &'static [Role] {
        match self {
            ItemStatus::DiDesain => &[Role::Desainer],
            ItemStatus::AccAdmin => &[Role::Admin],
            ItemStatus::Operator => &[Role::Operator],
            ItemStatus::Selesai => &[Role::Admin],
            ItemStatus::Dikirim => &[Role::Admin, Role::Owner],
            ItemStatus::SudahDiambil => &[Role::Admin],
            ItemStatus::Batal => &[Role::Owner],
            ItemStatus::Admin | ItemStatus::ProsesDesain | ItemStatus::ProsesCetak => &[],
        }
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "payment_status")]
pub enum PaymentStatus {
    #[sqlx(rename = "Lunas")]
    Lunas,
    #[sqlx(rename = "Belum Lunas")]
    #[serde(rename = "Belum Lunas")]
    BelumLunas,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Lunas => "Lunas",
            PaymentStatus::BelumLunas => "Belum Lunas",
        }
    }
}

// --- Invoice (pedido) ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = "IA-ORD-0001")]
    pub invoice_code: String,
    pub client_id: Option<i64>,
    #[schema(example = "Budi Santoso")]
    pub client_name: Option<String>,
    pub status: ItemStatus,
    pub payment_status: PaymentStatus,
    #[schema(example = "150000.00")]
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- Item do pedido ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    #[schema(example = 1)]
    pub id: i64,
    pub invoice_id: i64,
    #[schema(example = "ORD-001")]
    pub order_code: String,
    pub product_id: i64,
    #[schema(example = 3)]
    pub qty: i32,
    #[schema(example = "3.00")]
    pub p: Option<Decimal>,
    #[schema(example = "1.00")]
    pub l: Option<Decimal>,
    #[schema(example = "25000.00")]
    pub price: Decimal,
    #[schema(example = "75000.00")]
    pub subtotal: Decimal,
    pub status: ItemStatus,
    pub desainer: Option<i64>,
    pub operator: Option<i64>,
    pub finishing: Option<String>,
    pub nama_file: Option<String>,
    pub keterangan: Option<String>,
    pub created_at: DateTime<Utc>,
}

// Item com os nomes juntados (produto, desainer, operador) para o detalhe.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemDetail {
    pub id: i64,
    pub invoice_id: i64,
    pub order_code: String,
    pub product_id: i64,
    pub product_name: String,
    pub qty: i32,
    pub p: Option<Decimal>,
    pub l: Option<Decimal>,
    pub price: Decimal,
    pub subtotal: Decimal,
    pub status: ItemStatus,
    pub designer_name: Option<String>,
    pub operator_name: Option<String>,
    pub finishing: Option<String>,
    pub nama_file: Option<String>,
    pub keterangan: Option<String>,
    pub created_at: DateTime<Utc>,
}

// Linha da listagem de pedidos.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub id: i64,
    pub invoice_code: String,
    pub client_name: Option<String>,
    pub status: ItemStatus,
    pub payment_status: PaymentStatus,
    pub total: Decimal,
    #[schema(example = 2)]
    pub items_count: i64,
    #[schema(example = "Banner Flexi 280g")]
    pub first_product: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    #[serde(flatten)]
    pub header: Order,
    pub items: Vec<OrderItemDetail>,
}

// --- Histórico (trilha de auditoria da invoice) ---
// O campo status é um rótulo livre: além dos status do fluxo, a trilha
// registra marcos como "Hapus Item" e mudanças de pagamento.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: i64,
    pub order_id: i64,
    #[schema(example = "Proses Desain")]
    pub status: String,
    #[schema(example = "Item ORD-001 em produção")]
    pub deskripsi: String,
    pub tanggal: DateTime<Utc>,
}

// Linha das filas de produção (desenho e impressão), com o contexto
// que a bancada precisa: cliente, produto, medidas e responsável.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductionQueueItem {
    pub item_id: i64,
    pub order_code: String,
    pub invoice_id: i64,
    pub invoice_code: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub product_name: String,
    pub p: Option<Decimal>,
    pub l: Option<Decimal>,
    pub qty: i32,
    pub finishing: Option<String>,
    pub nama_file: Option<String>,
    pub designer_name: Option<String>,
    pub operator_name: Option<String>,
    pub keterangan: Option<String>,
    pub status: ItemStatus,
    pub created_at: DateTime<Utc>,
}

// --- Payloads de entrada ---

// Item na criação/substituição de um pedido. O preço vem da tabela de
// produtos no momento da gravação; o subtotal é sempre derivado.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderItemInput {
    #[schema(example = 1)]
    pub product_id: i64,
    #[validate(range(min = 1, message = "quantidade deve ser pelo menos 1"))]
    #[schema(example = 3)]
    pub qty: i32,
    pub p: Option<Decimal>,
    pub l: Option<Decimal>,
    pub finishing: Option<String>,
    pub nama_file: Option<String>,
    pub keterangan: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderPayload {
    #[schema(example = 1)]
    pub client_id: i64,
    pub payment_status: Option<PaymentStatus>,
    // Status inicial dos itens (e da invoice); ausente = Admin.
    pub status: Option<ItemStatus>,
    #[validate(length(min = 1, message = "pedido precisa de ao menos um item"), nested)]
    pub items: Vec<NewOrderItemInput>,
}

// Atualização da invoice. `items`, quando presente, substitui TODOS os
// itens (apaga e reinsere, com códigos novos do contador global).
// Substituir com lista vazia é erro, não um update silencioso sem efeito.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderPayload {
    pub client_id: Option<i64>,
    pub status: Option<ItemStatus>,
    pub payment_status: Option<PaymentStatus>,
    #[validate(length(min = 1, message = "pedido precisa de ao menos um item"), nested)]
    pub items: Option<Vec<NewOrderItemInput>>,
}

// Atualização parcial de um item. Status fica de fora: mudanças de
// status passam pelos endpoints de transição (ou pelo override).
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderItemPayload {
    #[validate(range(min = 1, message = "quantidade deve ser pelo menos 1"))]
    pub qty: Option<i32>,
    pub p: Option<Decimal>,
    pub l: Option<Decimal>,
    pub price: Option<Decimal>,
    pub finishing: Option<String>,
    pub nama_file: Option<String>,
    pub keterangan: Option<String>,
    pub operator: Option<i64>,
    pub desainer: Option<i64>,
}

// Override administrativo: o enum fechado é a própria allow-list.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemStatusPayload {
    #[schema(example = "Operator")]
    pub status: ItemStatus,
}

// Corpo dos endpoints de claim das bancadas (kerjakan).
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClaimItemPayload {
    #[schema(example = 1)]
    pub item_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotulos_de_status_sao_o_contrato_da_api() {
        let labels: Vec<&str> = ItemStatus::ALL.iter().map(|s| s.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "Admin",
                "Di Desain",
                "Proses Desain",
                "Operator",
                "Proses Cetak",
                "Acc Admin",
                "Selesai",
                "Dikirim",
                "Sudah Diambil",
                "Batal",
            ]
        );
        // serde usa os mesmos rótulos do banco
        assert_eq!(
            serde_json::to_string(&ItemStatus::DiDesain).unwrap(),
            "\"Di Desain\""
        );
        let parsed: ItemStatus = serde_json::from_str("\"Sudah Diambil\"").unwrap();
        assert_eq!(parsed, ItemStatus::SudahDiambil);
    }

    #[test]
    fn status_desconhecido_e_rejeitado_na_desserializacao() {
        // A allow-list do override administrativo é o próprio enum fechado.
        let result: Result<ItemStatus, _> = serde_json::from_str("\"Entregue\"");
        assert!(result.is_err());
    }

    #[test]
    fn apenas_sudah_diambil_e_batal_sao_terminais() {
        for status in ItemStatus::ALL {
            let expected = matches!(status, ItemStatus::SudahDiambil | ItemStatus::Batal);
            assert_eq!(status.is_terminal(), expected, "status {status}");
        }
    }

    #[test]
    fn tabela_status_para_papeis_e_exata() {
        use Role::*;
        assert_eq!(ItemStatus::DiDesain.notified_roles(), &[Desainer]);
        assert_eq!(ItemStatus::AccAdmin.notified_roles(), &[Admin]);
        assert_eq!(ItemStatus::Operator.notified_roles(), &[Operator]);
        assert_eq!(ItemStatus::Selesai.notified_roles(), &[Admin]);
        assert_eq!(ItemStatus::Dikirim.notified_roles(), &[Admin, Owner]);
        assert_eq!(ItemStatus::SudahDiambil.notified_roles(), &[Admin]);
        assert_eq!(ItemStatus::Batal.notified_roles(), &[Owner]);
        // Fases intermediárias não notificam ninguém.
        assert!(ItemStatus::Admin.notified_roles().is_empty());
        assert!(ItemStatus::ProsesDesain.notified_roles().is_empty());
        assert!(ItemStatus::ProsesCetak.notified_roles().is_empty());
    }

    #[test]
    fn fluxo_de_desenho_cobre_so_as_duas_fases() {
        assert!(ItemStatus::DiDesain.in_design_flow());
        assert!(ItemStatus::ProsesDesain.in_design_flow());
        assert!(!ItemStatus::AccAdmin.in_design_flow());
        assert!(!ItemStatus::Batal.in_design_flow());
    }

    #[test]
    fn kerjakan_duas_vezes_perde_a_guarda_na_segunda() {
        // o primeiro claim deixa o item no status "próximo", que não casa
        // mais com o esperado do UPDATE guardado
        let (esperado, proximo) = ItemStatus::START_DESIGN;
        assert!(esperado.can_start_design());
        assert!(!proximo.can_start_design());

        let (esperado, proximo) = ItemStatus::START_JOB;
        assert!(esperado.can_start_job());
        assert!(!proximo.can_start_job());
    }

    #[test]
    fn kirim_so_e_permitido_a_partir_da_fase_em_processo() {
        let (esperado, proximo) = ItemStatus::FINISH_DESIGN;
        assert!(esperado.can_finish_design());
        assert!(!proximo.can_finish_design());

        let (esperado, proximo) = ItemStatus::FINISH_JOB;
        assert!(esperado.can_finish_job());
        assert!(!proximo.can_finish_job());
    }

    #[test]
    fn guardas_das_bancadas_rejeitam_qualquer_outro_status() {
        for status in ItemStatus::ALL {
            assert_eq!(status.can_start_design(), status == ItemStatus::DiDesain);
            assert_eq!(status.can_finish_design(), status == ItemStatus::ProsesDesain);
            assert_eq!(status.can_start_job(), status == ItemStatus::Operator);
            assert_eq!(status.can_finish_job(), status == ItemStatus::ProsesCetak);
        }
    }

    #[test]
    fn cancelamento_duplo_fica_fora_dos_conjuntos() {
        // o primeiro cancel grava 'Batal'; a segunda chamada não casa com
        // o filtro e não gera segunda linha de histórico
        assert!(!ItemStatus::cancelable().contains(&ItemStatus::Batal));
        assert!(!ItemStatus::design_cancelable().contains(&ItemStatus::Batal));
        assert!(!ItemStatus::cancelable().contains(&ItemStatus::SudahDiambil));
    }

    #[test]
    fn conjuntos_de_cancelamento_seguem_fluxo_e_terminalidade() {
        assert_eq!(
            ItemStatus::design_cancelable(),
            vec![ItemStatus::DiDesain, ItemStatus::ProsesDesain]
        );
        let geral = ItemStatus::cancelable();
        assert_eq!(geral.len(), 8);
        assert!(geral.contains(&ItemStatus::Admin));
        assert!(geral.contains(&ItemStatus::Dikirim));
    }

    #[test]
    fn update_com_lista_de_itens_vazia_e_rejeitado() {
        let payload = UpdateOrderPayload {
            client_id: None,
            status: None,
            payment_status: None,
            items: Some(vec![]),
        };
        assert!(payload.validate().is_err());

        let sem_items = UpdateOrderPayload {
            client_id: None,
            status: None,
            payment_status: None,
            items: None,
        };
        assert!(sem_items.validate().is_ok());
    }
}
