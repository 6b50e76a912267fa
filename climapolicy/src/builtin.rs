//! The built-in table set used when no workbook is given. Sheet names and layouts are the
//! same as in the published workbook: emissions, energy mix and pathways are wide, the policy
//! assessment is long.

use polars::prelude::*;

use crate::error::Result;
use crate::workbook::Workbook;
use crate::COL;

/// (category, party, level, description)
const POLICIES: [(&str, &str, i64, &str); 21] = [
    ("거버넌스", "국민의 힘", 3, "탄소중립녹색성장 위원회 기능 강화, 기후위기특별위원회 상설화, 석탄화력발전소 폐지지역 지원 특별법 제정 및 탄소중립기본법 개정"),
    ("배출권거래제", "국민의 힘", 3, "배출권거래제 유상할당 확대"),
    ("기후금융", "국민의 힘", 2, "2027년 5조원"),
    ("기후금융", "더불어민주당", 3, "2027년까지 7조 이상, 탄소세 도입"),
    ("녹색금융", "국민의 힘", 3, "민관합동 녹색투자 펀드 조성, 산업은행 탄소중립 정책금융 확대, 중소·중견기업을 위한 녹색자산유동화증권 이자 비용지원 확대"),
    ("녹색금융", "사회대전환", 1, "산업은행을 녹색투자은행으로 전환"),
    ("감축목표", "더불어민주당", 1, "2035년 2018년 대비 52% 감축"),
    ("탈석탄", "더불어민주당", 2, "2040년 탈석탄"),
    ("재생에너지", "더불어민주당", 2, "2030 재생에너지 비중 40%"),
    ("재생에너지", "사회대전환", 3, "2030 재생에너지 비중 50%, 2050년 100%"),
    ("원자력", "국민의 힘", 1, "SMR 기술 개발 적극 추진"),
    ("원자력", "사회대전환", -2, "원전 신규 건설 중단, 핵발전소 수명연장 금지"),
    ("산업", "국민의 힘", 2, "탄소차액계약제도(CCfD) 도입, CCUS 산업 활성화 및 재정지원 확대"),
    ("산업", "더불어민주당", 3, "탄소차액계약제도(CCfD) 도입, 산단태양광 설치의무화제도 도입"),
    ("산업", "사회대전환", 1, "탄소국경조정제도(CBAM)에 대비한 국가 전략 수립과 대응 체계 구축"),
    ("수송", "개혁신당", 1, "미래차(수소·전기) 산업 지원, 2차전지 산업 육성"),
    ("건물", "더불어민주당", 2, "제로에너지건축물 활성화, 제로에너지건축 및 그린리모델링 시 저리대출 및 보조금 지원 확대"),
    ("건물", "사회대전환", 3, "녹색주택 100만호 공급, 건물 에너지 효율 등급제 도입"),
    ("플라스틱&폐기물", "국민의 힘", 1, "플라스틱 경량화·재생원료 사용 확대, 폐자원 순환경제망 구축"),
    ("플라스틱&폐기물", "더불어민주당", 2, "탈플라스틱 컨트롤타워 설치, 플라스틱 폐기물부담금 부과요율 현실화, 수리권 보장 확대"),
    ("플라스틱&폐기물", "사회대전환", 3, "국내 석유화학업계 화석연료 사용 규제 및 생산자책임재활용제도(EPR) 강화"),
];

fn policies() -> PolarsResult<DataFrame> {
    df!(
        COL::POLICY_CATEGORY => POLICIES.iter().map(|p| p.0).collect::<Vec<_>>(),
        COL::PARTY => POLICIES.iter().map(|p| p.1).collect::<Vec<_>>(),
        COL::POLICY_LEVEL => POLICIES.iter().map(|p| p.2).collect::<Vec<_>>(),
        COL::POLICY_DESCRIPTION => POLICIES.iter().map(|p| p.3).collect::<Vec<_>>(),
    )
}

fn emissions() -> PolarsResult<DataFrame> {
    df!(
        COL::SECTOR => &["총배출", "전환", "산업", "건물", "수송", "농축수산", "폐기물"],
        "2018년 기준" => &[727.6, 269.6, 260.5, 52.1, 98.1, 24.7, 17.1],
        "2030 NDC" => &[436.6, 145.9, 230.7, 35.0, 61.0, 18.0, 9.1],
        "더불어민주당" => &[400.0, 120.0, 215.0, 32.0, 55.0, 16.0, 8.0],
        "국민의 힘" => &[436.6, 140.0, 228.0, 35.0, 61.0, 18.0, 9.1],
        "사회대전환" => &[363.8, 90.0, 190.0, 28.0, 45.0, 15.0, 7.0],
        "개혁신당" => &[Some(450.0), Some(150.0), None, None, Some(58.0), None, None],
    )
}

fn energy_mix() -> PolarsResult<DataFrame> {
    df!(
        COL::ENERGY_SOURCE => &["석탄", "LNG", "원자력", "태양광", "풍력", "수력", "바이오", "기타"],
        "2023년(현재)" => &[31.4, 26.8, 30.7, 5.6, 0.6, 0.5, 2.5, 1.9],
        "2030 NDC" => &[19.7, 22.9, 32.4, 13.0, 6.0, 0.6, 2.0, 3.4],
        "더불어민주당" => &[15.0, 20.0, 25.0, 25.0, 12.0, 0.6, 1.4, 1.0],
        "국민의 힘" => &[17.0, 20.0, 38.0, 14.0, 6.0, 0.6, 1.4, 3.0],
        "사회대전환" => &[Some(10.0), Some(20.0), Some(18.0), Some(32.0), Some(18.0), Some(0.6), Some(1.4), None],
    )
}

fn pathways() -> PolarsResult<DataFrame> {
    df!(
        COL::YEAR => &[2018i64, 2030, 2040, 2050],
        "1.5°C 경로" => &[727.6, 378.4, 160.0, 0.0],
        "2°C 경로" => &[727.6, 487.5, 290.0, 80.0],
        "3°C 경로" => &[727.6, 650.0, 560.0, 470.0],
        "더불어민주당" => &[727.6, 400.0, 180.0, 5.0],
        "국민의 힘" => &[727.6, 436.6, 250.0, 30.0],
        "사회대전환" => &[727.6, 363.8, 150.0, 0.0],
    )
}

/// The four built-in sheets, in the order of the published workbook.
pub fn workbook() -> Result<Workbook> {
    Ok(Workbook::from_sheets([
        ("정성평가_기준".to_string(), policies()?),
        ("온실가스종합비교".to_string(), emissions()?),
        ("에너지믹스".to_string(), energy_mix()?),
        ("온도경로".to_string(), pathways()?),
    ]))
}
